//! Raw data storage and interchange

pub mod database;
pub mod feature_table;
pub mod seed;

pub use database::Database;
