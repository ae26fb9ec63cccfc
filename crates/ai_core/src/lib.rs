//! Rating estimation core for coffee shop profiles
//!
//! Turns categorical shop attributes into a fixed numeric layout and fits an
//! exact Gaussian-process regressor over it.
//!
//! Modules:
//! - `schema`: attribute vocabulary and the versioned feature schema
//! - `record`: shop profiles as key/value attribute maps
//! - `encoder`: ordinal + one-hot feature encoding
//! - `scaler`: target standardization
//! - `kernel`: categorical / RBF covariance functions
//! - `linalg`: Cholesky factorization and solves
//! - `gp`: the mixed-kernel regression model
//! - `fingerprint`: canonical corpus hashing

pub mod encoder;
pub mod errors;
pub mod fingerprint;
pub mod gp;
pub mod kernel;
pub mod linalg;
pub mod record;
pub mod scaler;
pub mod schema;

pub use encoder::{FeatureEncoder, FeatureVector, FittedEncoder, OneHotBlock};
pub use errors::{CoreError, Result};
pub use fingerprint::{corpus_fingerprint, to_canonical_json};
pub use gp::{Hyperparameters, MixedKernelModel, Posterior};
pub use kernel::{KernelHyperparameters, KernelStructure, MixedKernel};
pub use record::ShopRecord;
pub use scaler::TargetScaler;
pub use schema::{
    attribute_names, ColumnKind, FeatureColumn, FeatureSchema, CATEGORICAL_ATTRIBUTES,
    ORDINAL_ATTRIBUTES, SCHEMA_VERSION,
};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
