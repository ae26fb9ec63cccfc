//! Marginal-likelihood training for the mixed-kernel model
//!
//! Runs a fixed budget of Adam steps on the negative exact marginal
//! log-likelihood. There is no early stopping; every iteration checks that the
//! loss, gradient and parameters stay finite.

use crema_ai_core::{CoreError, Hyperparameters, MixedKernelModel, TargetScaler};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::optimizer::{Adam, AdamConfig};

/// Training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub iterations: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            iterations: 150,
        }
    }
}

/// Outcome of a completed fit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FitReport {
    pub iterations: usize,
    pub initial_loss: f64,
    pub final_loss: f64,
    pub hyperparameters: Hyperparameters,
    /// Root-mean-square error on the holdout rows, in rating units
    pub holdout_rmse: Option<f64>,
}

/// Fits model hyperparameters in place
pub struct Trainer {
    params: TrainingParams,
}

impl Trainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Run the full iteration budget and leave `model` ready for posterior queries
    #[instrument(skip(self, model), fields(rows = model.train_len(), iterations = self.params.iterations))]
    pub fn fit(&self, model: &mut MixedKernelModel) -> Result<FitReport, CoreError> {
        let mut raw = model.raw_params();
        let mut adam = Adam::new(
            AdamConfig {
                learning_rate: self.params.learning_rate,
                ..AdamConfig::default()
            },
            raw.len(),
        );

        let mut initial_loss = f64::NAN;
        let mut loss = f64::NAN;

        for iteration in 0..self.params.iterations {
            let (step_loss, grad) = model.neg_mll_with_grad().map_err(|err| match err {
                CoreError::NumericFit(msg) => {
                    CoreError::NumericFit(format!("iteration {}: {}", iteration, msg))
                }
                other => other,
            })?;

            if !step_loss.is_finite() {
                return Err(CoreError::NumericFit(format!(
                    "iteration {}: loss is {}",
                    iteration, step_loss
                )));
            }
            if grad.iter().any(|g| !g.is_finite()) {
                return Err(CoreError::NumericFit(format!(
                    "iteration {}: gradient is not finite",
                    iteration
                )));
            }

            if iteration == 0 {
                initial_loss = step_loss;
            }
            loss = step_loss;

            adam.step(&mut raw, &grad);
            if raw.iter().any(|p| !p.is_finite()) {
                return Err(CoreError::NumericFit(format!(
                    "iteration {}: parameters diverged",
                    iteration
                )));
            }
            model.set_raw_params(&raw)?;

            if (iteration + 1) % 25 == 0 {
                debug!("Iteration {}/{} loss={:.5}", iteration + 1, self.params.iterations, step_loss);
            }
        }

        model.refresh_posterior()?;
        let hyperparameters = model.hyperparameters();
        info!(
            "Training complete: loss {:.5} -> {:.5}, noise {:.5}",
            initial_loss, loss, hyperparameters.noise
        );

        Ok(FitReport {
            iterations: self.params.iterations,
            initial_loss,
            final_loss: loss,
            hyperparameters,
            holdout_rmse: None,
        })
    }
}

/// RMSE of posterior means against holdout ratings, in rating units
pub fn holdout_rmse(
    model: &MixedKernelModel,
    features: &Array2<f64>,
    ratings: &[f64],
    scaler: &TargetScaler,
) -> Result<Option<f64>, CoreError> {
    if ratings.is_empty() {
        return Ok(None);
    }
    let posteriors = model.posterior_many(features)?;
    let sse: f64 = posteriors
        .iter()
        .zip(ratings)
        .map(|(p, &r)| (scaler.inverse_transform(p.mean) - r).powi(2))
        .sum();
    Ok(Some((sse / ratings.len() as f64).sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crema_ai_core::{ColumnKind, FeatureColumn, FeatureSchema};
    use ndarray::{array, Array1};

    fn schema(width: usize) -> FeatureSchema {
        FeatureSchema::new(
            (0..width)
                .map(|i| FeatureColumn {
                    name: format!("c{}", i),
                    attribute: format!("c{}", i),
                    kind: ColumnKind::OneHot,
                    cardinality: 2,
                })
                .collect(),
        )
    }

    fn model() -> MixedKernelModel {
        let x = array![
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0]
        ];
        let y: Array1<f64> = array![1.3, -0.9, 1.1, -1.2, 0.4, -0.7];
        MixedKernelModel::new(&schema(3), x, y).unwrap()
    }

    #[test]
    fn test_fit_reduces_loss() {
        let mut model = model();
        let report = Trainer::new(TrainingParams::default()).fit(&mut model).unwrap();
        assert_eq!(report.iterations, 150);
        assert!(report.final_loss < report.initial_loss);
        assert!(report.hyperparameters.noise > 0.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let mut a = model();
        let mut b = model();
        let trainer = Trainer::new(TrainingParams::default());
        trainer.fit(&mut a).unwrap();
        trainer.fit(&mut b).unwrap();
        assert_eq!(a.raw_params(), b.raw_params());
    }

    #[test]
    fn test_diverging_learning_rate_is_reported() {
        let mut model = model();
        let trainer = Trainer::new(TrainingParams {
            learning_rate: f64::INFINITY,
            iterations: 3,
        });
        let err = trainer.fit(&mut model).unwrap_err();
        assert!(matches!(err, CoreError::NumericFit(_)), "unexpected error {:?}", err);
    }

    #[test]
    fn test_zero_iterations_still_prepares_posterior() {
        let mut model = model();
        let report = Trainer::new(TrainingParams {
            learning_rate: 0.01,
            iterations: 0,
        })
        .fit(&mut model)
        .unwrap();
        assert!(report.final_loss.is_nan());
        assert!(model.posterior(&[1.0, 0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_holdout_rmse() {
        let mut model = model();
        model.refresh_posterior().unwrap();
        let scaler = TargetScaler { mean: 3.0, scale: 1.0 };
        assert_eq!(holdout_rmse(&model, &Array2::zeros((0, 3)), &[], &scaler).unwrap(), None);
        let rmse = holdout_rmse(&model, &array![[1.0, 0.0, 1.0]], &[4.0], &scaler)
            .unwrap()
            .unwrap();
        assert!(rmse.is_finite() && rmse >= 0.0);
    }
}
