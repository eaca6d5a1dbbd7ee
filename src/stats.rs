use crate::schema::{AggregateTimings, LoopSamples};

pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Unbiased sample standard deviation (divides by `n - 1`); `0` for fewer than two samples.
pub fn sample_std(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Aggregate one loop time per outer run into the result timings.
///
/// A single run produces the singular shape with both deviations fixed at `0`.
pub fn summarize(warmup_time: f64, loop_times: Vec<f64>, iterates_per_run: u32) -> AggregateTimings {
    debug_assert!(!loop_times.is_empty());
    let iterates = f64::from(iterates_per_run);
    let per_iter_times: Vec<f64> = loop_times.iter().map(|t| t / iterates).collect();

    let mean_loop_time = mean(&loop_times);
    let mean_per_iter_time = mean(&per_iter_times);

    if loop_times.len() == 1 {
        return AggregateTimings {
            warmup_time,
            samples: LoopSamples::Single {
                loop_time: loop_times[0],
                per_iter_time: per_iter_times[0],
            },
            mean_loop_time,
            mean_per_iter_time,
            std_loop_times: 0.0,
            std_per_iter_time: 0.0,
        };
    }

    AggregateTimings {
        warmup_time,
        std_loop_times: sample_std(&loop_times),
        std_per_iter_time: sample_std(&per_iter_times),
        samples: LoopSamples::Multi {
            loop_times,
            per_iter_times,
        },
        mean_loop_time,
        mean_per_iter_time,
    }
}
