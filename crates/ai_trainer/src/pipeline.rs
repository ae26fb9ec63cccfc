//! Request-scoped prediction pipeline
//!
//! load corpus → fit encoder → build dataset → scale targets → train → predict.
//!
//! By default every request refits from the freshly read corpus. With
//! `cache_artifacts` enabled the fitted encoder, model and scaler are kept
//! while the corpus fingerprint and training configuration stay the same.

use crema_ai_core::{
    corpus_fingerprint, CoreError, FeatureEncoder, FeatureSchema, FittedEncoder,
    MixedKernelModel, ShopRecord, TargetScaler,
};
use ndarray::Array1;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::CremaConfig;
use crate::corpus::load_corpus;
use crate::dataset::{rated_records, DatasetBuilder};
use crate::errors::{PredictionError, TrainerError};
use crate::predictor::{Prediction, Predictor};
use crate::trainer::{holdout_rmse, FitReport, Trainer};

/// Everything needed to answer queries against one corpus
#[derive(Clone, Debug)]
pub struct FittedArtifacts {
    pub fingerprint: String,
    pub encoder: FittedEncoder,
    pub model: MixedKernelModel,
    pub scaler: TargetScaler,
    pub report: FitReport,
    pub train_rows: usize,
    pub holdout_rows: usize,
}

impl FittedArtifacts {
    /// Fit all artifacts from in-memory records
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn fit(records: &[ShopRecord], config: &CremaConfig) -> Result<Self, TrainerError> {
        let rated = rated_records(records);
        if rated.is_empty() {
            return Err(CoreError::Corpus("corpus has no rated records".into()).into());
        }
        let fingerprint = corpus_fingerprint(&rated)?;

        let encoder = FeatureEncoder::new().fit(&rated)?;
        let dataset = DatasetBuilder::new(config.split.holdout_fraction, config.split.seed)
            .build(&encoder, &rated)?;

        let train_ratings = dataset.train_targets();
        let scaler = TargetScaler::fit(&train_ratings)?;
        let train_y = Array1::from(scaler.transform_all(&train_ratings));

        info!(
            "Training on {} rows ({} held out) with {} features",
            dataset.split.train.len(),
            dataset.split.holdout.len(),
            dataset.feature_count()
        );

        let mut model = MixedKernelModel::new(&dataset.schema, dataset.train_features(), train_y)?;
        let mut report = Trainer::new(config.training.clone()).fit(&mut model)?;
        report.holdout_rmse = holdout_rmse(
            &model,
            &dataset.holdout_features(),
            &dataset.holdout_targets(),
            &scaler,
        )?;
        if let Some(rmse) = report.holdout_rmse {
            info!("Holdout RMSE: {:.4}", rmse);
        }

        Ok(Self {
            fingerprint,
            encoder,
            model,
            scaler,
            report,
            train_rows: dataset.split.train.len(),
            holdout_rows: dataset.split.holdout.len(),
        })
    }

    pub fn predict(&self, predictor: &Predictor, query: &ShopRecord) -> Result<Prediction, PredictionError> {
        predictor.predict(&self.encoder, &self.model, &self.scaler, query)
    }
}

/// Last fitted artifacts, keyed by corpus fingerprint and training configuration
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entry: Option<(CremaConfig, FittedArtifacts)>,
    hits: u64,
    misses: u64,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Return cached artifacts when the corpus and configuration are unchanged,
    /// otherwise refit and replace the entry.
    pub fn get_or_fit(
        &mut self,
        records: &[ShopRecord],
        config: &CremaConfig,
    ) -> Result<&FittedArtifacts, TrainerError> {
        let fingerprint = corpus_fingerprint(&rated_records(records))?;
        let fresh = matches!(
            &self.entry,
            Some((cached_config, artifacts))
                if artifacts.fingerprint == fingerprint && cached_config == config
        );

        if fresh {
            self.hits += 1;
        } else {
            self.misses += 1;
            info!("Corpus fingerprint {} not cached, refitting", &fingerprint[..12]);
            self.entry = Some((config.clone(), FittedArtifacts::fit(records, config)?));
        }

        match &self.entry {
            Some((_, artifacts)) => Ok(artifacts),
            None => Err(CoreError::Corpus("artifact cache is empty".into()).into()),
        }
    }
}

/// Serves prediction requests against the configured corpus
#[derive(Debug)]
pub struct Pipeline {
    config: CremaConfig,
    predictor: Predictor,
    cache: ArtifactCache,
}

impl Pipeline {
    pub fn new(config: CremaConfig) -> Self {
        Self {
            predictor: Predictor::new(config.std_scale),
            config,
            cache: ArtifactCache::new(),
        }
    }

    pub fn config(&self) -> &CremaConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Answer one query, reading the corpus fresh from disk
    pub fn predict(&mut self, query: &ShopRecord) -> Result<Prediction, PredictionError> {
        let records = load_corpus(&self.config.corpus_dir)?;
        self.predict_with_records(&records, query)
    }

    /// Answer one query against an already loaded corpus
    pub fn predict_with_records(
        &mut self,
        records: &[ShopRecord],
        query: &ShopRecord,
    ) -> Result<Prediction, PredictionError> {
        if self.config.cache_artifacts {
            let artifacts = self.cache.get_or_fit(records, &self.config)?;
            artifacts.predict(&self.predictor, query)
        } else {
            FittedArtifacts::fit(records, &self.config)?.predict(&self.predictor, query)
        }
    }
}

/// One-shot prediction with a fresh fit
pub fn run_prediction(config: &CremaConfig, query: &ShopRecord) -> Result<Prediction, PredictionError> {
    Pipeline::new(config.clone()).predict(query)
}

/// Corpus summary without training
#[derive(Clone, Debug, Serialize)]
pub struct CorpusInspection {
    pub fingerprint: String,
    pub records: usize,
    pub rated_records: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub rating_min: f64,
    pub rating_max: f64,
    pub schema: FeatureSchema,
}

/// Encode and split the corpus, reporting its layout
pub fn inspect_corpus(records: &[ShopRecord], config: &CremaConfig) -> Result<CorpusInspection, TrainerError> {
    let rated = rated_records(records);
    if rated.is_empty() {
        return Err(CoreError::Corpus("corpus has no rated records".into()).into());
    }
    let encoder = FeatureEncoder::new().fit(&rated)?;
    let dataset = DatasetBuilder::new(config.split.holdout_fraction, config.split.seed)
        .build(&encoder, &rated)?;
    let (rating_min, rating_max) = dataset.target_range();

    Ok(CorpusInspection {
        fingerprint: corpus_fingerprint(&rated)?,
        records: records.len(),
        rated_records: rated.len(),
        train_rows: dataset.split.train.len(),
        holdout_rows: dataset.split.holdout.len(),
        rating_min,
        rating_max,
        schema: encoder.schema().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crema_ai_core::attribute_names;

    fn shop(i: usize) -> ShopRecord {
        let prices = ["Cheap", "Average", "Expensive"];
        let roasts = ["Light", "Medium", "Medium-dark", "Dark"];
        let flags = ["Yes", "No"];
        let values = [
            prices[i % 3],
            roasts[i % 4],
            "Good",
            "Sweet",
            "Strong",
            flags[i % 2],
            flags[(i / 2) % 2],
            "Yes",
            "No",
            flags[(i / 3) % 2],
        ];
        let mut record = ShopRecord::new(format!("shop{:02}", i)).with_rating(1.0 + (i % 5) as f64);
        for (key, value) in attribute_names().zip(values) {
            record = record.with_attribute(key, value);
        }
        record
    }

    fn quick_config() -> CremaConfig {
        let mut config = CremaConfig::default();
        config.training.iterations = 20;
        config
    }

    #[test]
    fn test_fit_artifacts() {
        let records: Vec<_> = (0..12).map(shop).collect();
        let artifacts = FittedArtifacts::fit(&records, &quick_config()).unwrap();
        assert_eq!(artifacts.train_rows + artifacts.holdout_rows, 12);
        assert_eq!(artifacts.holdout_rows, 2);
        assert!(artifacts.report.holdout_rmse.is_some());
    }

    #[test]
    fn test_cache_hits_until_corpus_changes() {
        let mut records: Vec<_> = (0..8).map(shop).collect();
        let config = quick_config();
        let mut cache = ArtifactCache::new();

        cache.get_or_fit(&records, &config).unwrap();
        cache.get_or_fit(&records, &config).unwrap();
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        records[0].rating = Some(4.9);
        cache.get_or_fit(&records, &config).unwrap();
        assert_eq!(cache.misses(), 2);

        let mut other = config.clone();
        other.split.seed = 7;
        cache.get_or_fit(&records, &other).unwrap();
        assert_eq!(cache.misses(), 3);

        cache.invalidate();
        cache.get_or_fit(&records, &other).unwrap();
        assert_eq!((cache.hits(), cache.misses()), (1, 4));
    }

    #[test]
    fn test_cached_and_fresh_predictions_agree() {
        let records: Vec<_> = (0..10).map(shop).collect();
        let query = ShopRecord::query(records[3].attributes.clone());

        let mut fresh = Pipeline::new(quick_config());
        let mut cached_config = quick_config();
        cached_config.cache_artifacts = true;
        let mut cached = Pipeline::new(cached_config);
        assert!(cached.config().cache_artifacts);
        assert!(!fresh.config().cache_artifacts);

        let a = fresh.predict_with_records(&records, &query).unwrap();
        let b = cached.predict_with_records(&records, &query).unwrap();
        let c = cached.predict_with_records(&records, &query).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(cached.cache().hits(), 1);
    }

    #[test]
    fn test_empty_corpus() {
        let err = FittedArtifacts::fit(&[], &quick_config()).unwrap_err();
        assert!(matches!(err, TrainerError::Core(CoreError::Corpus(_))));
    }

    #[test]
    fn test_inspect_corpus() {
        let records: Vec<_> = (0..10).map(shop).collect();
        let inspection = inspect_corpus(&records, &CremaConfig::default()).unwrap();
        assert_eq!(inspection.rated_records, 10);
        assert_eq!(inspection.holdout_rows, 1);
        assert_eq!(inspection.rating_min, 1.0);
        assert_eq!(inspection.rating_max, 5.0);
        assert_eq!(inspection.schema.continuous_dims().len(), 0);
    }
}
