//! Runtime configuration
//!
//! Layered in order: built-in defaults, an optional TOML file, then
//! `CREMA_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `CREMA_TRAINING__ITERATIONS=200`).

use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dataset::{DEFAULT_SPLIT_SEED, HOLDOUT_FRACTION};
use crate::errors::TrainerError;
use crate::predictor::StdScale;
use crate::trainer::TrainingParams;

/// Default corpus directory, relative to the working directory
pub const DEFAULT_CORPUS_DIR: &str = "Coffee Shops";

/// Train/holdout split settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub holdout_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: HOLDOUT_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

/// Complete pipeline configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CremaConfig {
    /// Directory of shop documents
    pub corpus_dir: PathBuf,
    pub training: TrainingParams,
    pub split: SplitConfig,
    /// Units for the reported standard deviation
    pub std_scale: StdScale,
    /// Reuse fitted artifacts while the corpus fingerprint is unchanged
    pub cache_artifacts: bool,
}

impl Default for CremaConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from(DEFAULT_CORPUS_DIR),
            training: TrainingParams::default(),
            split: SplitConfig::default(),
            std_scale: StdScale::default(),
            cache_artifacts: false,
        }
    }
}

impl CremaConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// A file path that was given explicitly must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, TrainerError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(TrainerError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("CREMA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CremaConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrainerError> {
        if !(self.training.learning_rate > 0.0) || !self.training.learning_rate.is_finite() {
            return Err(TrainerError::Config(format!(
                "learning rate must be positive, got {}",
                self.training.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.split.holdout_fraction) {
            return Err(TrainerError::Config(format!(
                "holdout fraction must be in [0, 1), got {}",
                self.split.holdout_fraction
            )));
        }
        Ok(())
    }
}
