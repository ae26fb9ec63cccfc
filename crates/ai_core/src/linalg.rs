//! Dense Cholesky factorization and triangular solves

use crate::errors::{CoreError, Result};
use ndarray::{Array1, Array2};

/// Diagonal jitter attempted, in order, when a factorization fails
pub const JITTER_SCHEDULE: [f64; 4] = [0.0, 1e-8, 1e-7, 1e-6];

/// Lower-triangular factor `L` with `A + jitter·I = L·Lᵀ`
#[derive(Debug, Clone)]
pub struct Cholesky {
    lower: Array2<f64>,
    jitter: f64,
}

impl Cholesky {
    /// Factor a symmetric positive-definite matrix, retrying with jitter
    pub fn factor(a: &Array2<f64>) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(CoreError::ShapeMismatch {
                expected: n,
                actual: a.ncols(),
            });
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::NumericFit("covariance contains non-finite entries".into()));
        }

        for &jitter in &JITTER_SCHEDULE {
            if let Some(lower) = try_factor(a, jitter) {
                if jitter > 0.0 {
                    tracing::debug!(jitter, "cholesky succeeded with jitter");
                }
                return Ok(Self { lower, jitter });
            }
        }

        Err(CoreError::NumericFit(format!(
            "covariance of size {} is not positive definite",
            n
        )))
    }

    pub fn lower(&self) -> &Array2<f64> {
        &self.lower
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Solve `L x = b`
    pub fn solve_lower(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.dim();
        let mut x = Array1::zeros(n);
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.lower[[i, k]] * x[k];
            }
            x[i] = sum / self.lower[[i, i]];
        }
        x
    }

    /// Solve `Lᵀ x = b`
    pub fn solve_upper(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.dim();
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = b[i];
            for k in (i + 1)..n {
                sum -= self.lower[[k, i]] * x[k];
            }
            x[i] = sum / self.lower[[i, i]];
        }
        x
    }

    /// Solve `A x = b`
    pub fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        self.solve_upper(&self.solve_lower(b))
    }

    /// `A⁻¹`, built column by column
    pub fn inverse(&self) -> Array2<f64> {
        let n = self.dim();
        let mut inv = Array2::zeros((n, n));
        for j in 0..n {
            let mut e = Array1::zeros(n);
            e[j] = 1.0;
            inv.column_mut(j).assign(&self.solve(&e));
        }
        inv
    }

    /// `log |A|`
    pub fn log_det(&self) -> f64 {
        2.0 * self.lower.diag().iter().map(|d| d.ln()).sum::<f64>()
    }
}

fn try_factor(a: &Array2<f64>, jitter: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]] + jitter;
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > 0.0) || !diag.is_finite() {
            return None;
        }
        let d = diag.sqrt();
        l[[j, j]] = d;
        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / d;
        }
    }
    Some(l)
}
