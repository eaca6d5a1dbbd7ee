//! Analytic 2D velocity fields used by the builtin solver.

use std::f64::consts::PI;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Flow {
    /// Periodically forced double gyre on [0, 2] x [0, 1].
    DoubleGyre { a: f64, eps: f64, omega: f64 },
    /// Three-mode perturbed Bickley jet (Mm, days).
    BickleyJet,
}

const DG_A: f64 = 0.1;
const DG_EPS: f64 = 0.25;

const BJ_U: f64 = 5.4138;
const BJ_L: f64 = 1.77;
const BJ_R0: f64 = 6.371;
const BJ_EPS: [f64; 3] = [0.0075, 0.15, 0.3];
const BJ_C_OVER_U: [f64; 3] = [0.1446, 0.205, 0.461];

impl Flow {
    pub fn double_gyre() -> Self {
        Flow::DoubleGyre {
            a: DG_A,
            eps: DG_EPS,
            omega: 2.0 * PI / 10.0,
        }
    }

    /// Look up a flow by its configuration name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "double_gyre" => Ok(Self::double_gyre()),
            "bickley_jet" => Ok(Flow::BickleyJet),
            other => Err(ConfigError::invalid(
                "flow_data.flow_str",
                format!("unknown flow `{other}` (double_gyre|bickley_jet)"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Flow::DoubleGyre { .. } => "double_gyre",
            Flow::BickleyJet => "bickley_jet",
        }
    }

    /// Default `[[x0, x1], [y0, y1]]` domain.
    pub fn default_domain(&self) -> [[f64; 2]; 2] {
        match self {
            Flow::DoubleGyre { .. } => [[0.0, 2.0], [0.0, 1.0]],
            Flow::BickleyJet => [[0.0, PI * BJ_R0], [-3.0, 3.0]],
        }
    }

    /// Velocity `(u, v)` at `(x, y)` and time `t`.
    #[inline]
    pub fn velocity(&self, t: f64, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Flow::DoubleGyre { a, eps, omega } => {
                let s = eps * (omega * t).sin();
                let b = 1.0 - 2.0 * s;
                let f = s * x * x + b * x;
                let dfdx = 2.0 * s * x + b;
                let u = -PI * a * (PI * f).sin() * (PI * y).cos();
                let v = PI * a * (PI * f).cos() * (PI * y).sin() * dfdx;
                (u, v)
            }
            Flow::BickleyJet => {
                let sech2 = 1.0 / (y / BJ_L).cosh().powi(2);
                let tanh = (y / BJ_L).tanh();
                let mut sum_cos = 0.0;
                let mut sum_sin = 0.0;
                for n in 0..3 {
                    let k = 2.0 * (n as f64 + 1.0) / BJ_R0;
                    let phase = k * (x - BJ_C_OVER_U[n] * BJ_U * t);
                    sum_cos += BJ_EPS[n] * phase.cos();
                    sum_sin += BJ_EPS[n] * k * phase.sin();
                }
                let u = BJ_U * sech2 + 2.0 * BJ_U * sech2 * tanh * sum_cos;
                let v = -BJ_U * BJ_L * sech2 * sum_sin;
                (u, v)
            }
        }
    }

    /// One classical RK4 step of size `h` from `(x, y)` at time `t`.
    #[inline]
    pub fn rk4_step(&self, t: f64, x: f64, y: f64, h: f64) -> (f64, f64) {
        let (k1u, k1v) = self.velocity(t, x, y);
        let (k2u, k2v) = self.velocity(t + 0.5 * h, x + 0.5 * h * k1u, y + 0.5 * h * k1v);
        let (k3u, k3v) = self.velocity(t + 0.5 * h, x + 0.5 * h * k2u, y + 0.5 * h * k2v);
        let (k4u, k4v) = self.velocity(t + h, x + h * k3u, y + h * k3v);
        (
            x + h / 6.0 * (k1u + 2.0 * k2u + 2.0 * k3u + k4u),
            y + h / 6.0 * (k1v + 2.0 * k2v + 2.0 * k3v + k4v),
        )
    }
}
