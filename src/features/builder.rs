//! Builds model-ready feature rows from weekly training metrics
//!
//! One row per training record, labeled with whether an injury occurred
//! exactly seven days after the week start.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{InjuryEvent, Player, PlayerId, Result, RiskError, TrainingMetricRecord};

/// Offset between a training week's start and the injury date that labels it
const LABEL_OFFSET_DAYS: i64 = 7;

/// Additive smoothing applied to the ratio denominator so near-zero previous
/// loads cannot blow up the ratio
const RATIO_SMOOTHING: f64 = 0.1;

const RATIO_MIN: f64 = 0.5;
const RATIO_MAX: f64 = 2.0;

/// One model-ready feature row per (player, week)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub player_id: i64,
    pub player_name: String,
    pub position: String,
    pub training_load_hours: f64,
    pub workload_ratio: f64,
    pub intensity_avg: f64,
    pub recovery_score: f64,
    pub fatigue_level: f64,
    pub avg_load_4week: f64,
    pub injury_occurred: u8,
}

impl FeatureRow {
    /// Columns the model trains on, in vector order
    pub const MODEL_FEATURES: [&'static str; 5] = [
        "training_load_hours",
        "workload_ratio",
        "intensity_avg",
        "recovery_score",
        "fatigue_level",
    ];

    /// Feature vector for model input
    pub fn feature_vector(&self) -> [f64; 5] {
        [
            self.training_load_hours,
            self.workload_ratio,
            self.intensity_avg,
            self.recovery_score,
            self.fatigue_level,
        ]
    }

    pub fn label(&self) -> usize {
        self.injury_occurred as usize
    }
}

/// Row with source nullables still unresolved, before imputation
#[derive(Debug, Clone)]
struct PartialRow {
    player_id: i64,
    player_name: String,
    position: String,
    training_load_hours: f64,
    workload_ratio: f64,
    intensity_avg: Option<f64>,
    recovery_score: Option<f64>,
    fatigue_level: Option<f64>,
    avg_load_4week: f64,
    injury_occurred: u8,
}

/// Computes feature rows from raw record sets
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build one feature row per training record, ordered by
    /// (player_id, week_start_date) ascending.
    ///
    /// Empty input yields an empty table; callers decide whether that is a
    /// hard "no data" condition.
    pub fn build(
        players: &[Player],
        metrics: &[TrainingMetricRecord],
        injuries: &[InjuryEvent],
    ) -> Result<Vec<FeatureRow>> {
        if metrics.is_empty() {
            return Ok(Vec::new());
        }

        let by_id: HashMap<PlayerId, &Player> = players.iter().map(|p| (p.id, p)).collect();

        let injury_dates: HashSet<(PlayerId, NaiveDate)> = injuries
            .iter()
            .map(|i| (i.player_id, i.injury_date))
            .collect();

        // Group per player, sorted by week within each group
        let mut grouped: BTreeMap<PlayerId, Vec<&TrainingMetricRecord>> = BTreeMap::new();
        for metric in metrics {
            grouped.entry(metric.player_id).or_default().push(metric);
        }

        let mut rows = Vec::with_capacity(metrics.len());

        for (player_id, mut series) in grouped {
            let player = by_id
                .get(&player_id)
                .copied()
                .ok_or(RiskError::PlayerNotFound(player_id))?;

            series.sort_by_key(|m| m.week_start_date);
            for window in series.windows(2) {
                if window[0].week_start_date == window[1].week_start_date {
                    return Err(RiskError::DataIntegrity(format!(
                        "duplicate training week {} for {}",
                        window[0].week_start_date, player_id
                    )));
                }
            }

            for (k, metric) in series.iter().enumerate() {
                let load = metric.training_load_hours;
                let prev_load = if k > 0 {
                    Some(series[k - 1].training_load_hours)
                } else {
                    None
                };

                // Trailing mean over the current and up to 3 preceding weeks
                let window_start = k.saturating_sub(3);
                let window = &series[window_start..=k];
                let avg_load_4week = window
                    .iter()
                    .map(|m| m.training_load_hours)
                    .sum::<f64>()
                    / window.len() as f64;

                // First week falls back to the current load, giving a near
                // neutral ratio rather than zero
                let ratio = load / (prev_load.unwrap_or(load) + RATIO_SMOOTHING);
                let workload_ratio = ratio.clamp(RATIO_MIN, RATIO_MAX);

                let label_date = metric.week_start_date + Duration::days(LABEL_OFFSET_DAYS);
                let injury_occurred = u8::from(injury_dates.contains(&(player_id, label_date)));

                rows.push(PartialRow {
                    player_id: player_id.0,
                    player_name: player.name.clone(),
                    position: player.position.clone(),
                    training_load_hours: load,
                    workload_ratio,
                    intensity_avg: metric.intensity_avg,
                    recovery_score: metric.recovery_score,
                    fatigue_level: metric.fatigue_level,
                    avg_load_4week,
                    injury_occurred,
                });
            }
        }

        impute_missing(rows)
    }
}

/// Fill missing nullable columns with the column mean over all rows.
///
/// Runs after ratio and label computation; a column with no observed values
/// at all cannot be imputed and is a data-integrity error.
fn impute_missing(rows: Vec<PartialRow>) -> Result<Vec<FeatureRow>> {
    let intensity_mean = column_mean(&rows, |r| r.intensity_avg, "intensity_avg")?;
    let recovery_mean = column_mean(&rows, |r| r.recovery_score, "recovery_score")?;
    let fatigue_mean = column_mean(&rows, |r| r.fatigue_level, "fatigue_level")?;

    Ok(rows
        .into_iter()
        .map(|r| FeatureRow {
            player_id: r.player_id,
            player_name: r.player_name,
            position: r.position,
            training_load_hours: r.training_load_hours,
            workload_ratio: r.workload_ratio,
            intensity_avg: r.intensity_avg.unwrap_or(intensity_mean),
            recovery_score: r.recovery_score.unwrap_or(recovery_mean),
            fatigue_level: r.fatigue_level.unwrap_or(fatigue_mean),
            avg_load_4week: r.avg_load_4week,
            injury_occurred: r.injury_occurred,
        })
        .collect())
}

fn column_mean(
    rows: &[PartialRow],
    get: impl Fn(&PartialRow) -> Option<f64>,
    name: &str,
) -> Result<f64> {
    let values: Vec<f64> = rows.iter().filter_map(&get).collect();
    if values.is_empty() {
        return Err(RiskError::DataIntegrity(format!(
            "column {} has no values to impute from",
            name
        )));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
