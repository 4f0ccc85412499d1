//! Feature engineering from raw training records

pub mod builder;

pub use builder::{FeatureBuilder, FeatureRow};
