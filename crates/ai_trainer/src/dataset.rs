//! Training set assembly and train/holdout splitting
//!
//! Encodes rated records with a fitted encoder and partitions the rows with a
//! seeded permutation so the split is reproducible for a given corpus order.

use crema_ai_core::{CoreError, FeatureSchema, FittedEncoder, ShopRecord};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deterministic::permutation;

/// Share of rows held out from training
pub const HOLDOUT_FRACTION: f64 = 0.1;

/// Seed used for the train/holdout permutation
pub const DEFAULT_SPLIT_SEED: u64 = 63;

/// Row indices of each partition, in permutation order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Encoded design matrix, targets and their partition
#[derive(Clone, Debug)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub targets: Array1<f64>,
    /// Shop names, one per row
    pub names: Vec<String>,
    pub schema: FeatureSchema,
    pub split: Split,
}

impl TrainingSet {
    /// Get number of rows
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    /// Columns routed to the categorical kernel
    pub fn categorical_dims(&self) -> Vec<usize> {
        self.schema.categorical_dims()
    }

    pub fn train_features(&self) -> Array2<f64> {
        self.features.select(Axis(0), &self.split.train)
    }

    pub fn train_targets(&self) -> Vec<f64> {
        self.split.train.iter().map(|&i| self.targets[i]).collect()
    }

    pub fn holdout_features(&self) -> Array2<f64> {
        self.features.select(Axis(0), &self.split.holdout)
    }

    pub fn holdout_targets(&self) -> Vec<f64> {
        self.split.holdout.iter().map(|&i| self.targets[i]).collect()
    }

    /// (min, max) of the ratings
    pub fn target_range(&self) -> (f64, f64) {
        self.targets
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)))
    }
}

/// Records that carry a rating, in corpus order
pub fn rated_records(records: &[ShopRecord]) -> Vec<ShopRecord> {
    records
        .iter()
        .filter(|r| {
            let rated = r.rating.is_some();
            if !rated {
                debug!(record = %r.name, "skipping unrated record");
            }
            rated
        })
        .cloned()
        .collect()
}

/// Builds a [`TrainingSet`] from historical records
#[derive(Clone, Debug)]
pub struct DatasetBuilder {
    holdout_fraction: f64,
    seed: u64,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self {
            holdout_fraction: HOLDOUT_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

impl DatasetBuilder {
    pub fn new(holdout_fraction: f64, seed: u64) -> Self {
        Self {
            holdout_fraction: holdout_fraction.clamp(0.0, 1.0),
            seed,
        }
    }

    /// Partition `n` rows; at least one row always stays in training
    pub fn split(&self, n: usize) -> Split {
        let perm = permutation(n, self.seed);
        let holdout = ((n as f64 * self.holdout_fraction).ceil() as usize).min(n.saturating_sub(1));
        Split {
            holdout: perm[..holdout].to_vec(),
            train: perm[holdout..].to_vec(),
        }
    }

    /// Encode every rated record and split the rows
    pub fn build(&self, encoder: &FittedEncoder, records: &[ShopRecord]) -> Result<TrainingSet, CoreError> {
        let rated = rated_records(records);
        if rated.is_empty() {
            return Err(CoreError::Corpus("no records with a rating".into()));
        }
        if let Some(bad) = rated.iter().find(|r| r.rating.is_some_and(|v| !v.is_finite())) {
            return Err(CoreError::Corpus(format!(
                "record '{}' has non-finite rating",
                bad.name
            )));
        }

        let features = encoder.transform_many(&rated)?;
        let targets: Array1<f64> = rated.iter().filter_map(|r| r.rating).collect();
        let split = self.split(rated.len());

        debug!(
            rows = rated.len(),
            train = split.train.len(),
            holdout = split.holdout.len(),
            "dataset built"
        );

        Ok(TrainingSet {
            features,
            targets,
            names: rated.iter().map(|r| r.name.clone()).collect(),
            schema: encoder.schema().clone(),
            split,
        })
    }
}
