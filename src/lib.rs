//! Athlete injury-risk prediction
//!
//! Builds weekly workload features from training records, trains a random
//! forest classifier on injury outcomes, and publishes categorized risk
//! scores per player.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// A player reference record, created once at onboarding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: String,
    pub position: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
}

/// Per-game box-score statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatRecord {
    pub player_id: PlayerId,
    pub game_date: NaiveDate,
    pub minutes_played: f64,
    pub field_goals_attempted: u32,
    pub field_goals_made: u32,
    pub rebounds: u32,
    pub assists: u32,
}

/// One week of training workload and recovery measurements for a player.
///
/// Intensity, recovery and fatigue can be missing at the source; load and
/// session count are always recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetricRecord {
    pub player_id: PlayerId,
    pub week_start_date: NaiveDate,
    pub training_load_hours: f64,
    pub intensity_avg: Option<f64>,
    pub sessions_count: u32,
    pub recovery_score: Option<f64>,
    pub fatigue_level: Option<f64>,
}

/// Severity category of an injury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn code(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Minor" => Some(Severity::Minor),
            "Moderate" => Some(Severity::Moderate),
            "Severe" => Some(Severity::Severe),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An injury sustained by a player on a specific date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryEvent {
    pub player_id: PlayerId,
    pub injury_date: NaiveDate,
    pub injury_type: String,
    pub severity: Severity,
    pub recovery_days: u32,
    pub reinjury_risk: f64,
}

/// Discrete risk band derived from a continuous probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Map a risk probability to its category.
    ///
    /// Boundary values belong to the lower band: 0.33 is Low, 0.67 is
    /// Medium. 1.0 is High.
    pub fn from_score(score: f64) -> Self {
        if score <= 0.33 {
            RiskCategory::Low
        } else if score <= 0.67 {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Low" => Some(RiskCategory::Low),
            "Medium" => Some(RiskCategory::Medium),
            "High" => Some(RiskCategory::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A published risk score for a player on a scoring-run date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub player_id: PlayerId,
    pub prediction_date: NaiveDate,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    pub model_version: String,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No data - run `riskwatch data seed` or load records first")]
    NoData,

    #[error("Model not found at {0} - run `riskwatch train` first")]
    NoModel(String),

    #[error("Player not found with ID: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Stratified split needs at least 2 injury examples, found {found}")]
    TooFewPositives { found: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub features_path: String,
    pub model_path: String,
    pub metrics_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub train_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub players: usize,
    pub weeks: usize,
    pub injury_rate: f64,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/riskwatch.db".to_string(),
                features_path: "data/features.csv".to_string(),
                model_path: "model/injury_model.bin".to_string(),
                metrics_path: "data/model_metrics.json".to_string(),
            },
            model: ModelConfig {
                n_trees: 100,
                max_depth: 10,
                min_samples_split: 5,
                min_samples_leaf: 2,
                version: "v1.0".to_string(),
            },
            training: TrainingConfig {
                train_fraction: 0.8,
                cv_folds: 5,
                seed: 42,
            },
            synthetic: SyntheticConfig {
                players: 20,
                weeks: 52,
                injury_rate: 0.18,
                seed: 7,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| RiskError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RiskError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
