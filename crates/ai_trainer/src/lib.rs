//! Crema trainer - rating estimation pipeline for coffee shop profiles
//!
//! Reads the Markdown record store, builds a reproducible train/holdout
//! split, fits the mixed-kernel Gaussian process by marginal-likelihood
//! optimization and answers queries for unseen shops.

pub mod config;
pub mod corpus;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod optimizer;
pub mod pipeline;
pub mod predictor;
pub mod trainer;

pub use config::{CremaConfig, SplitConfig};
pub use corpus::{load_corpus, parse_front_matter};
pub use dataset::{rated_records, DatasetBuilder, Split, TrainingSet};
pub use deterministic::{permutation, LcgRng};
pub use errors::{PredictionError, TrainerError};
pub use optimizer::{Adam, AdamConfig};
pub use pipeline::{
    inspect_corpus, run_prediction, ArtifactCache, CorpusInspection, FittedArtifacts, Pipeline,
};
pub use predictor::{Prediction, Predictor, StdScale};
pub use trainer::{holdout_rmse, FitReport, Trainer, TrainingParams};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
