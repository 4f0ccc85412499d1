//! Bagged ensemble of Gini decision trees for injury classification

use std::fs;
use std::path::Path;

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;
use crate::model::RiskModel;
use crate::{ModelConfig, Result, RiskError};

/// Hyperparameters for the forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_weight_split: f32,
    pub min_weight_leaf: f32,
    pub seed: u64,
}

impl ForestConfig {
    pub fn from_model_config(config: &ModelConfig, seed: u64) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_weight_split: config.min_samples_split as f32,
            min_weight_leaf: config.min_samples_leaf as f32,
            seed,
        }
    }
}

/// Random forest built by bootstrap-aggregating single decision trees.
///
/// Each tree trains on a bootstrap resample of the data with class-balanced
/// sample weights, and the ensemble probability is the fraction of trees
/// voting for the positive class.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean Gini importance of each feature across all trees.
    pub fn feature_importances(&self) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::Model("model has not been fitted".into()));
        }
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.feature_importance()) {
                *total += value;
            }
        }
        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }

    /// Inverse-frequency sample weights, so the minority (injured) class
    /// contributes as much total weight as the majority class.
    fn balanced_weights(labels: &Array1<usize>) -> Array1<f32> {
        let n = labels.len() as f32;
        let positives = labels.iter().filter(|&&l| l == 1).count() as f32;
        let negatives = n - positives;

        let weight_for = |count: f32| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
        let w_pos = weight_for(positives);
        let w_neg = weight_for(negatives);

        labels.mapv(|l| if l == 1 { w_pos } else { w_neg })
    }
}

impl RiskModel for RandomForest {
    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<usize>) -> Result<()> {
        if features.nrows() == 0 {
            return Err(RiskError::NoData);
        }
        if features.nrows() != labels.len() {
            return Err(RiskError::Model(format!(
                "feature rows ({}) do not match labels ({})",
                features.nrows(),
                labels.len()
            )));
        }

        let n_rows = features.nrows();
        self.n_features = features.ncols();
        self.trees = Vec::with_capacity(self.config.n_trees);

        for t in 0..self.config.n_trees {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

            let x = features.select(Axis(0), &sample);
            let y = labels.select(Axis(0), &sample);
            let weights = Self::balanced_weights(&y);
            let dataset = DatasetBase::new(x, y).with_weights(weights);

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(Some(self.config.max_depth))
                .min_weight_split(self.config.min_weight_split)
                .min_weight_leaf(self.config.min_weight_leaf)
                .fit(&dataset)
                .map_err(|e| RiskError::Model(e.to_string()))?;
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict_probability(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::Model("model has not been fitted".into()));
        }
        if features.ncols() != self.n_features {
            return Err(RiskError::Model(format!(
                "expected {} features, got {}",
                self.n_features,
                features.ncols()
            )));
        }

        let mut votes = vec![0usize; features.nrows()];
        for tree in &self.trees {
            let predicted = tree.predict(features);
            for (count, &label) in votes.iter_mut().zip(predicted.iter()) {
                *count += label;
            }
        }
        let n = self.trees.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / n).collect())
    }
}

/// Serialized model plus the metadata needed to score new data with it
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub feature_names: Vec<String>,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn new(version: &str, forest: RandomForest) -> Self {
        Self {
            version: version.to_string(),
            feature_names: FeatureRow::MODEL_FEATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            forest,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded =
            bincode::serialize(self).map_err(|e| RiskError::Model(e.to_string()))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).map_err(|_| RiskError::NoModel(path.display().to_string()))?;
        bincode::deserialize(&bytes)
            .map_err(|_| RiskError::NoModel(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn test_config(n_trees: usize, seed: u64) -> ForestConfig {
        ForestConfig {
            n_trees,
            max_depth: 5,
            min_weight_split: 2.0,
            min_weight_leaf: 1.0,
            seed,
        }
    }

    /// Two well-separated clusters: positives near 10, negatives near 0.
    fn separable_data() -> (Array2<f64>, Array1<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let offset = (i % 5) as f64 * 0.1;
            if i % 2 == 0 {
                rows.push([10.0 + offset, 10.0 - offset]);
                labels.push(1);
            } else {
                rows.push([offset, offset * 0.5]);
                labels.push(0);
            }
        }
        let x = Array2::from_shape_vec(
            (rows.len(), 2),
            rows.iter().flatten().copied().collect(),
        )
        .unwrap();
        (x, Array1::from_vec(labels))
    }

    #[test]
    fn test_forest_learns_separable_classes() {
        let (x, y) = separable_data();
        let mut forest = RandomForest::new(test_config(25, 42));
        forest.fit(&x, &y).unwrap();

        let probs = forest
            .predict_probability(&array![[10.0, 10.0], [0.0, 0.0]])
            .unwrap();
        assert!(probs[0] > 0.8, "positive cluster scored {}", probs[0]);
        assert!(probs[1] < 0.2, "negative cluster scored {}", probs[1]);
    }

    #[test]
    fn test_probabilities_within_unit_interval() {
        let (x, y) = separable_data();
        let mut forest = RandomForest::new(test_config(10, 1));
        forest.fit(&x, &y).unwrap();

        let probs = forest.predict_probability(&x).unwrap();
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_fit_is_deterministic_under_seed() {
        let (x, y) = separable_data();

        let mut a = RandomForest::new(test_config(15, 9));
        a.fit(&x, &y).unwrap();
        let mut b = RandomForest::new(test_config(15, 9));
        b.fit(&x, &y).unwrap();

        assert_eq!(
            a.predict_probability(&x).unwrap(),
            b.predict_probability(&x).unwrap()
        );
    }

    #[test]
    fn test_unfitted_forest_rejected() {
        let forest = RandomForest::new(test_config(5, 0));
        let err = forest.predict_probability(&array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, RiskError::Model(_)));
        assert!(forest.feature_importances().is_err());
    }

    #[test]
    fn test_feature_importances_sum_and_shape() {
        let (x, y) = separable_data();
        let mut forest = RandomForest::new(test_config(10, 3));
        forest.fit(&x, &y).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances.iter().all(|&v| v >= 0.0));
        assert!(importances.iter().sum::<f64>() > 0.0);
    }

    #[test]
    fn test_artifact_roundtrip() {
        let (x, y) = separable_data();
        let mut forest = RandomForest::new(test_config(8, 4));
        forest.fit(&x, &y).unwrap();
        let expected = forest.predict_probability(&x).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("injury_model.bin");
        ModelArtifact::new("v1.0", forest).save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.version, "v1.0");
        assert_eq!(loaded.feature_names.len(), 5);
        assert_eq!(loaded.forest.predict_probability(&x).unwrap(), expected);
    }

    #[test]
    fn test_missing_artifact_reported_as_no_model() {
        let err = ModelArtifact::load(Path::new("/nonexistent/model.bin")).unwrap_err();
        assert!(matches!(err, RiskError::NoModel(_)));
    }
}
