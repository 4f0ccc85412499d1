pub mod metrics;
pub mod trainer;

pub use metrics::{EvaluationReport, FeatureImportance};
pub use trainer::{TrainOutcome, Trainer};
