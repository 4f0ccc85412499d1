//! Risk model and dataset partitioning

pub mod forest;
pub mod split;

pub use forest::{ForestConfig, ModelArtifact, RandomForest};
pub use split::{stratified_split, SplitIndices};

use ndarray::{Array1, Array2};

use crate::Result;

/// Capability surface of a trainable risk classifier.
///
/// Any binary classifier exposing fit/predict-probability can back the
/// pipeline; the random forest is the shipped implementation.
pub trait RiskModel {
    /// Fit the model on a feature matrix and 0/1 labels
    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<usize>) -> Result<()>;

    /// Predicted probability of the positive (injury) class per row
    fn predict_probability(&self, features: &Array2<f64>) -> Result<Vec<f64>>;
}
