//! Model training and evaluation pipeline

use log::info;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::features::FeatureRow;
use crate::model::{stratified_split, ForestConfig, RandomForest, RiskModel};
use crate::training::metrics::{accuracy, roc_auc, EvaluationReport, FeatureImportance};
use crate::{Config, ModelConfig, Result, RiskError, TrainingConfig};

#[derive(Debug)]
pub struct TrainOutcome {
    pub forest: RandomForest,
    pub report: EvaluationReport,
}

pub struct Trainer {
    model: ModelConfig,
    training: TrainingConfig,
}

impl Trainer {
    pub fn new(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            training: config.training.clone(),
        }
    }

    /// Fit a forest on a stratified split of the feature rows and evaluate
    /// it on the held-out portion plus k-fold cross-validation.
    pub fn train(&self, rows: &[FeatureRow]) -> Result<TrainOutcome> {
        if rows.is_empty() {
            return Err(RiskError::NoData);
        }

        let (x, y) = to_matrix(rows);
        let labels: Vec<usize> = y.to_vec();

        let split = stratified_split(&labels, self.training.train_fraction, self.training.seed)?;
        info!(
            "training on {} rows, evaluating on {}",
            split.train.len(),
            split.eval.len()
        );

        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.eval);
        let y_test: Vec<usize> = split.eval.iter().map(|&i| labels[i]).collect();

        let mut forest = RandomForest::new(ForestConfig::from_model_config(
            &self.model,
            self.training.seed,
        ));
        forest.fit(&x_train, &y_train)?;

        let train_probs = forest.predict_probability(&x_train)?;
        let test_probs = forest.predict_probability(&x_test)?;

        let train_labels: Vec<usize> = y_train.to_vec();
        let auc = roc_auc(&test_probs, &y_test).ok_or_else(|| {
            RiskError::DataIntegrity("evaluation split contains a single class".into())
        })?;

        // Cross-validation uses only the training subset; the holdout stays
        // untouched until the final AUC.
        let (cv_mean, cv_std) = self.cross_validated_auc(&x_train, &train_labels)?;
        let importance = self.ranked_importances(&forest)?;

        let report = EvaluationReport {
            model_version: self.model.version.clone(),
            train_accuracy: accuracy(&train_probs, &train_labels),
            test_accuracy: accuracy(&test_probs, &y_test),
            roc_auc: auc,
            cv_mean,
            cv_std,
            feature_importance: importance,
        };
        Ok(TrainOutcome { forest, report })
    }

    /// Stratified k-fold cross-validation, scoring each fold by ROC-AUC.
    /// Folds that end up with a single class are skipped.
    fn cross_validated_auc(&self, x: &Array2<f64>, labels: &[usize]) -> Result<(f64, f64)> {
        let k = self.training.cv_folds;
        if k < 2 {
            return Err(RiskError::Config(format!(
                "cv_folds must be at least 2, got {}",
                k
            )));
        }

        // Shuffle within each class, then deal indices round-robin so every
        // fold keeps roughly the overall positive rate.
        let mut rng = StdRng::seed_from_u64(self.training.seed);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
        for class in [1usize, 0] {
            let mut members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);
            for (offset, idx) in members.into_iter().enumerate() {
                folds[offset % k].push(idx);
            }
        }

        let mut scores = Vec::new();
        for (fold, held_out) in folds.iter().enumerate() {
            let train_idx: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(f, _)| *f != fold)
                .flat_map(|(_, members)| members.iter().copied())
                .collect();
            let held_labels: Vec<usize> = held_out.iter().map(|&i| labels[i]).collect();
            let train_labels: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();
            if single_class(&held_labels) || single_class(&train_labels) {
                info!("skipping fold {}: single-class subset", fold + 1);
                continue;
            }

            let x_train = x.select(Axis(0), &train_idx);
            let y_train = Array1::from_vec(train_labels);
            let x_held = x.select(Axis(0), held_out);

            let seed = self.training.seed + 1000 + fold as u64;
            let mut forest =
                RandomForest::new(ForestConfig::from_model_config(&self.model, seed));
            forest.fit(&x_train, &y_train)?;

            let probs = forest.predict_probability(&x_held)?;
            if let Some(auc) = roc_auc(&probs, &held_labels) {
                scores.push(auc);
            }
        }

        if scores.is_empty() {
            return Err(RiskError::DataIntegrity(
                "no cross-validation fold contained both classes".into(),
            ));
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance =
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        Ok((mean, variance.sqrt()))
    }

    fn ranked_importances(&self, forest: &RandomForest) -> Result<Vec<FeatureImportance>> {
        let mut ranked: Vec<FeatureImportance> = FeatureRow::MODEL_FEATURES
            .iter()
            .zip(forest.feature_importances()?)
            .map(|(name, importance)| FeatureImportance {
                feature: name.to_string(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ranked)
    }
}

fn single_class(labels: &[usize]) -> bool {
    labels.windows(2).all(|w| w[0] == w[1])
}

/// Feature matrix and label vector in row order
pub fn to_matrix(rows: &[FeatureRow]) -> (Array2<f64>, Array1<usize>) {
    let n_features = FeatureRow::MODEL_FEATURES.len();
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        flat.extend_from_slice(&row.feature_vector());
    }
    let x = Array2::from_shape_vec((rows.len(), n_features), flat)
        .expect("row-major feature vector has fixed width");
    let y = Array1::from_iter(rows.iter().map(|r| r.label()));
    (x, y)
}
