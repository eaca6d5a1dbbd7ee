//! In-process FTLE solver over an analytic flow.
//!
//! Each invocation advects every grid point with fixed-step RK4, differentiates
//! the resulting flow map, and takes the largest Cauchy-Green eigenvalue:
//! `ftle = ln(lambda_max) / (2 |T|)`. Grid rows are swept in parallel.

use rayon::prelude::*;

use crate::config::FlowParams;
use crate::error::{ConfigError, SolverError};
use crate::field::DiagnosticField;
use crate::flows::Flow;
use crate::solver::{DiagnosticSolver, TimeWindow};

pub const DEFAULT_GRID_SHAPE: [usize; 2] = [201, 101];
pub const DEFAULT_INTEGRATION_STEPS: usize = 100;

#[derive(Clone, Debug)]
pub struct BuiltinFtle {
    name: String,
    flow: Flow,
    x: Vec<f64>,
    y: Vec<f64>,
    steps: usize,
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

impl BuiltinFtle {
    pub fn new(flow: Flow, domain: [[f64; 2]; 2], grid_shape: [usize; 2], steps: usize) -> Result<Self, ConfigError> {
        let [nx, ny] = grid_shape;
        if nx < 2 || ny < 2 {
            return Err(ConfigError::invalid(
                "flow_data.grid_shape",
                format!("needs at least 2 points per axis, got [{nx}, {ny}]"),
            ));
        }
        if steps == 0 {
            return Err(ConfigError::invalid("flow_data.integration_steps", "must be at least 1"));
        }
        for (axis, [lo, hi]) in ["x", "y"].into_iter().zip(domain) {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(ConfigError::invalid(
                    "flow_data.domain",
                    format!("{axis} bounds must be finite and increasing, got [{lo}, {hi}]"),
                ));
            }
        }
        Ok(Self {
            name: format!("builtin_ftle.{}", flow.name()),
            flow,
            x: linspace(domain[0][0], domain[0][1], nx),
            y: linspace(domain[1][0], domain[1][1], ny),
            steps,
        })
    }

    /// Build from `flow_data`, filling in per-flow defaults.
    pub fn from_params(params: &FlowParams) -> Result<Self, ConfigError> {
        if params.horizon == 0.0 {
            return Err(ConfigError::invalid("flow_data.T", "must be non-zero for FTLE"));
        }
        let flow = Flow::from_name(params.flow_str.as_deref().unwrap_or("double_gyre"))?;
        Self::new(
            flow,
            params.domain.unwrap_or_else(|| flow.default_domain()),
            params.grid_shape.unwrap_or(DEFAULT_GRID_SHAPE),
            params.integration_steps.unwrap_or(DEFAULT_INTEGRATION_STEPS),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        (self.x.len(), self.y.len())
    }

    fn flow_map(&self, window: TimeWindow) -> Vec<(f64, f64)> {
        let ny = self.y.len();
        let h = window.horizon / self.steps as f64;
        let mut out = vec![(0.0, 0.0); self.x.len() * ny];
        out.par_chunks_mut(ny).enumerate().for_each(|(i, row)| {
            let x0 = self.x[i];
            for (j, slot) in row.iter_mut().enumerate() {
                let (mut x, mut y) = (x0, self.y[j]);
                let mut t = window.t0;
                for _ in 0..self.steps {
                    (x, y) = self.flow.rk4_step(t, x, y, h);
                    t += h;
                }
                *slot = (x, y);
            }
        });
        out
    }
}

/// Largest eigenvalue of the symmetric 2x2 matrix `[[a, b], [b, d]]`.
#[inline]
fn max_eigenvalue_sym2(a: f64, b: f64, d: f64) -> f64 {
    let half_tr = 0.5 * (a + d);
    let half_diff = 0.5 * (a - d);
    half_tr + (half_diff * half_diff + b * b).sqrt()
}

/// FTLE of a flow map laid out on an `nx * ny` grid with spacings `dx`, `dy`.
///
/// Central differences in the interior, first-order one-sided at the edges.
/// Grids with fewer than two points along an axis have no gradient and map to NaN.
pub fn ftle_from_flow_map(flow_map: &[(f64, f64)], nx: usize, ny: usize, dx: f64, dy: f64, horizon: f64) -> Vec<f64> {
    debug_assert_eq!(flow_map.len(), nx * ny);
    if nx < 2 || ny < 2 {
        return vec![f64::NAN; nx * ny];
    }
    let at = |i: usize, j: usize| flow_map[i * ny + j];
    let diff = |lo: (f64, f64), hi: (f64, f64), span: f64| ((hi.0 - lo.0) / span, (hi.1 - lo.1) / span);
    let inv_2t = 1.0 / (2.0 * horizon.abs());

    let mut out = vec![0.0; nx * ny];
    out.par_chunks_mut(ny).enumerate().for_each(|(i, row)| {
        for (j, slot) in row.iter_mut().enumerate() {
            let (ddx_x, ddx_y) = match i {
                0 => diff(at(0, j), at(1, j), dx),
                i if i == nx - 1 => diff(at(i - 1, j), at(i, j), dx),
                i => diff(at(i - 1, j), at(i + 1, j), 2.0 * dx),
            };
            let (ddy_x, ddy_y) = match j {
                0 => diff(at(i, 0), at(i, 1), dy),
                j if j == ny - 1 => diff(at(i, j - 1), at(i, j), dy),
                j => diff(at(i, j - 1), at(i, j + 1), 2.0 * dy),
            };
            // F = [[ddx_x, ddy_x], [ddx_y, ddy_y]], C = F^T F
            let c11 = ddx_x * ddx_x + ddx_y * ddx_y;
            let c12 = ddx_x * ddy_x + ddx_y * ddy_y;
            let c22 = ddy_x * ddy_x + ddy_y * ddy_y;
            let lambda = max_eigenvalue_sym2(c11, c12, c22);
            *slot = if lambda > 0.0 { lambda.ln() * inv_2t } else { f64::NAN };
        }
    });
    out
}

impl DiagnosticSolver for BuiltinFtle {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_diagnostic(&mut self, window: TimeWindow) -> Result<DiagnosticField, SolverError> {
        if !(window.t0.is_finite() && window.horizon.is_finite()) || window.horizon == 0.0 {
            return Err(SolverError::Failed(format!(
                "invalid integration window t0={} T={}",
                window.t0, window.horizon
            )));
        }
        let (nx, ny) = self.grid_shape();
        let dx = self.x[1] - self.x[0];
        let dy = self.y[1] - self.y[0];
        let flow_map = self.flow_map(window);
        let values = ftle_from_flow_map(&flow_map, nx, ny, dx, dy, window.horizon);
        Ok(DiagnosticField::new(nx, ny, values)?)
    }
}
