//! Posterior queries for a single unseen shop profile

use crema_ai_core::{FittedEncoder, MixedKernelModel, ShopRecord, TargetScaler};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::errors::PredictionError;

/// Units in which the posterior standard deviation is reported
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdScale {
    /// Standardized target units, as the model sees them
    #[default]
    Standardized,
    /// Rating units: multiplied by the target scaler's scale
    Rating,
}

impl FromStr for StdScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standardized" => Ok(StdScale::Standardized),
            "rating" => Ok(StdScale::Rating),
            other => Err(format!("unknown std scale '{}' (expected standardized|rating)", other)),
        }
    }
}

impl fmt::Display for StdScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdScale::Standardized => write!(f, "standardized"),
            StdScale::Rating => write!(f, "rating"),
        }
    }
}

/// Posterior summary for one query
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Expected rating, in rating units
    pub mean: f64,
    /// Posterior standard deviation, in the units selected by [`StdScale`]
    pub std: f64,
}

/// Encodes a query and reads the fitted model's posterior
#[derive(Clone, Debug, Default)]
pub struct Predictor {
    std_scale: StdScale,
}

impl Predictor {
    pub fn new(std_scale: StdScale) -> Self {
        Self { std_scale }
    }

    pub fn std_scale(&self) -> StdScale {
        self.std_scale
    }

    pub fn predict(
        &self,
        encoder: &FittedEncoder,
        model: &MixedKernelModel,
        scaler: &TargetScaler,
        record: &ShopRecord,
    ) -> Result<Prediction, PredictionError> {
        let features = encoder.transform(record)?;
        let posterior = model.posterior(&features)?;

        let mean = scaler.inverse_transform(posterior.mean);
        let std = match self.std_scale {
            StdScale::Standardized => posterior.std(),
            StdScale::Rating => posterior.std() * scaler.scale,
        };
        debug!(mean, std, scale = %self.std_scale, "prediction");

        Ok(Prediction { mean, std })
    }
}
