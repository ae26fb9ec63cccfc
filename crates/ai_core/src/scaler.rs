//! Target standardization

use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaling of the rating target.
///
/// Uses the population standard deviation; a constant target keeps a scale of
/// one so the transform stays invertible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    pub mean: f64,
    pub scale: f64,
}

impl TargetScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(CoreError::Corpus("cannot fit target scaler on no ratings".into()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::Corpus("ratings must be finite".into()));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}
