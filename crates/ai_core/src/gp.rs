//! Exact Gaussian-process regression with a mixed categorical kernel
//!
//! The model keeps its (scaled) training inputs and standardized targets as
//! part of its parameterization. Hyperparameters are exposed as a flat raw
//! vector so an external optimizer can drive them:
//! `[kernel params..., raw noise, constant mean]`.

use crate::errors::{CoreError, Result};
use crate::kernel::{softplus, softplus_grad, KernelHyperparameters, MixedKernel};
use crate::linalg::Cholesky;
use crate::schema::FeatureSchema;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::f64::consts::PI;

/// Lower bound added to the softplus-mapped noise variance
pub const NOISE_LOWER_BOUND: f64 = 1e-4;

/// Min-max scaling of continuous columns; categorical columns pass through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputScaler {
    dims: Vec<usize>,
    mins: Vec<f64>,
    ranges: Vec<f64>,
}

impl InputScaler {
    pub fn fit(x: &Array2<f64>, dims: &[usize]) -> Self {
        let mut mins = Vec::with_capacity(dims.len());
        let mut ranges = Vec::with_capacity(dims.len());
        for &d in dims {
            let col = x.column(d);
            let min = col.iter().copied().fold(f64::INFINITY, f64::min);
            let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            mins.push(min);
            ranges.push(if range > f64::EPSILON { range } else { 1.0 });
        }
        Self {
            dims: dims.to_vec(),
            mins,
            ranges,
        }
    }

    pub fn apply_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        let mut out = row.to_owned();
        for ((&d, min), range) in self.dims.iter().zip(&self.mins).zip(&self.ranges) {
            out[d] = (out[d] - min) / range;
        }
        out
    }

    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let scaled = self.apply_row(row.view());
            row.assign(&scaled);
        }
        out
    }
}

/// Posterior at a single query point, in standardized target units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    pub mean: f64,
    pub variance: f64,
}

impl Posterior {
    pub fn std(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Learned hyperparameters in positive space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub kernel: KernelHyperparameters,
    pub noise: f64,
    pub constant_mean: f64,
}

#[derive(Debug, Clone)]
struct PosteriorCache {
    chol: Cholesky,
    alpha: Array1<f64>,
}

/// Gaussian-process regressor whose covariance is routed by a [`FeatureSchema`]
#[derive(Debug, Clone)]
pub struct MixedKernelModel {
    schema: FeatureSchema,
    kernel: MixedKernel,
    input_scaler: InputScaler,
    raw_noise: f64,
    constant_mean: f64,
    train_x: Array2<f64>,
    train_y: Array1<f64>,
    cache: Option<PosteriorCache>,
}

impl MixedKernelModel {
    /// Build an untrained model over `train_x` (raw encoded features) and
    /// `train_y` (already standardized targets).
    pub fn new(schema: &FeatureSchema, train_x: Array2<f64>, train_y: Array1<f64>) -> Result<Self> {
        if train_x.nrows() == 0 {
            return Err(CoreError::Corpus("model needs at least one training row".into()));
        }
        if train_x.ncols() != schema.len() {
            return Err(CoreError::ShapeMismatch {
                expected: schema.len(),
                actual: train_x.ncols(),
            });
        }
        if train_y.len() != train_x.nrows() {
            return Err(CoreError::ShapeMismatch {
                expected: train_x.nrows(),
                actual: train_y.len(),
            });
        }
        if train_x.iter().chain(train_y.iter()).any(|v| !v.is_finite()) {
            return Err(CoreError::InvalidParameters("training data must be finite".into()));
        }

        let kernel = MixedKernel::new(schema.categorical_dims(), schema.continuous_dims())?;
        let input_scaler = InputScaler::fit(&train_x, kernel.cont_dims());
        let train_x = input_scaler.apply(&train_x);

        Ok(Self {
            schema: schema.clone(),
            kernel,
            input_scaler,
            raw_noise: 0.0,
            constant_mean: 0.0,
            train_x,
            train_y,
            cache: None,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn kernel(&self) -> &MixedKernel {
        &self.kernel
    }

    pub fn train_len(&self) -> usize {
        self.train_x.nrows()
    }

    pub fn noise(&self) -> f64 {
        softplus(self.raw_noise) + NOISE_LOWER_BOUND
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            kernel: self.kernel.hyperparameters(),
            noise: self.noise(),
            constant_mean: self.constant_mean,
        }
    }

    pub fn num_params(&self) -> usize {
        self.kernel.num_params() + 2
    }

    pub fn raw_params(&self) -> Vec<f64> {
        let mut raw = self.kernel.raw_params();
        raw.push(self.raw_noise);
        raw.push(self.constant_mean);
        raw
    }

    /// Replace all raw parameters; invalidates the posterior cache
    pub fn set_raw_params(&mut self, raw: &[f64]) -> Result<()> {
        if raw.len() != self.num_params() {
            return Err(CoreError::ShapeMismatch {
                expected: self.num_params(),
                actual: raw.len(),
            });
        }
        let k = self.kernel.num_params();
        self.kernel.set_raw_params(&raw[..k])?;
        self.raw_noise = raw[k];
        self.constant_mean = raw[k + 1];
        self.cache = None;
        Ok(())
    }

    fn covariance(&self) -> Array2<f64> {
        let mut k = self.kernel.matrix(&self.train_x);
        let noise = self.noise();
        k.diag_mut().mapv_inplace(|v| v + noise);
        k
    }

    fn residuals(&self) -> Array1<f64> {
        self.train_y.mapv(|y| y - self.constant_mean)
    }

    /// Negative exact marginal log-likelihood per training point, with its
    /// gradient in raw-parameter order.
    pub fn neg_mll_with_grad(&self) -> Result<(f64, Vec<f64>)> {
        let n = self.train_len();
        let nf = n as f64;

        let (mut k, dk) = self.kernel.matrix_with_grads(&self.train_x);
        let noise = self.noise();
        k.diag_mut().mapv_inplace(|v| v + noise);

        let chol = Cholesky::factor(&k)?;
        let r = self.residuals();
        let alpha = chol.solve(&r);

        let data_fit = r.dot(&alpha);
        let loss = 0.5 * (data_fit + chol.log_det() + nf * (2.0 * PI).ln()) / nf;

        // W = K⁻¹ − ααᵀ; dL/dθ = ½ tr(W ∂K/∂θ) / n
        let mut w = chol.inverse();
        for i in 0..n {
            for j in 0..n {
                w[[i, j]] -= alpha[i] * alpha[j];
            }
        }

        let mut grad: Vec<f64> = dk.iter().map(|d| 0.5 * (&w * d).sum() / nf).collect();
        grad.push(0.5 * w.diag().sum() * softplus_grad(self.raw_noise) / nf);
        grad.push(-alpha.sum() / nf);

        Ok((loss, grad))
    }

    fn build_cache(&self) -> Result<PosteriorCache> {
        let chol = Cholesky::factor(&self.covariance())?;
        let alpha = chol.solve(&self.residuals());
        Ok(PosteriorCache { chol, alpha })
    }

    /// Factor the training covariance once for repeated posterior queries
    pub fn refresh_posterior(&mut self) -> Result<()> {
        self.cache = Some(self.build_cache()?);
        Ok(())
    }

    /// Latent posterior at one raw (unscaled) feature vector
    pub fn posterior(&self, x: &[f64]) -> Result<Posterior> {
        if x.len() != self.schema.len() {
            return Err(CoreError::ShapeMismatch {
                expected: self.schema.len(),
                actual: x.len(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::InvalidParameters("query features must be finite".into()));
        }

        let cache = match &self.cache {
            Some(cache) => Cow::Borrowed(cache),
            None => Cow::Owned(self.build_cache()?),
        };

        let query = self.input_scaler.apply_row(ArrayView1::from(x));
        let k_star = self.kernel.cross(query.view(), &self.train_x);
        let mean = self.constant_mean + k_star.dot(&cache.alpha);
        let v = cache.chol.solve_lower(&k_star);
        let variance = (self.kernel.diag_value() - v.dot(&v)).max(0.0);

        if !mean.is_finite() || !variance.is_finite() {
            return Err(CoreError::NumericFit("posterior is not finite".into()));
        }
        Ok(Posterior { mean, variance })
    }

    /// Posterior for every row of a raw feature matrix
    pub fn posterior_many(&self, x: &Array2<f64>) -> Result<Vec<Posterior>> {
        x.rows()
            .into_iter()
            .map(|row| self.posterior(&row.to_vec()))
            .collect()
    }
}
