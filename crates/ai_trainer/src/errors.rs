use crema_ai_core::CoreError;
use thiserror::Error;

/// Errors returned by the training pipeline.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for TrainerError {
    fn from(err: config::ConfigError) -> Self {
        TrainerError::Config(err.to_string())
    }
}

/// A request that could not produce a prediction.
#[derive(Debug, Error)]
#[error("prediction failed: {source}")]
pub struct PredictionError {
    #[from]
    pub source: TrainerError,
}

impl From<CoreError> for PredictionError {
    fn from(err: CoreError) -> Self {
        PredictionError {
            source: TrainerError::Core(err),
        }
    }
}

impl PredictionError {
    /// Underlying core error, when the failure came from encoding or fitting
    pub fn core(&self) -> Option<&CoreError> {
        match &self.source {
            TrainerError::Core(err) => Some(err),
            _ => None,
        }
    }
}
