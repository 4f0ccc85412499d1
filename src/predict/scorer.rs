//! Scoring feature rows with a saved model and publishing the results

use std::path::Path;

use chrono::NaiveDate;
use log::info;
use ndarray::Array2;

use crate::data::Database;
use crate::features::FeatureRow;
use crate::model::{ModelArtifact, RiskModel};
use crate::training::trainer::to_matrix;
use crate::{PlayerId, Result, RiskCategory, RiskError, RiskPrediction};

/// Scores feature rows with a previously trained forest
pub struct Scorer {
    artifact: ModelArtifact,
}

impl Scorer {
    pub fn load(model_path: &Path) -> Result<Self> {
        let artifact = ModelArtifact::load(model_path)?;
        info!(
            "loaded model {} ({} features)",
            artifact.version,
            artifact.feature_names.len()
        );
        Ok(Self { artifact })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    pub fn model_version(&self) -> &str {
        &self.artifact.version
    }

    /// Injury probability for each row, in input order.
    pub fn score(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Err(RiskError::NoData);
        }
        let (x, _): (Array2<f64>, _) = to_matrix(rows);
        self.artifact.forest.predict_probability(&x)
    }

    /// Score the rows and append one prediction per row to the database.
    /// Earlier predictions are never overwritten, so repeated runs build a
    /// history keyed by prediction date and model version.
    pub fn publish(
        &self,
        db: &Database,
        rows: &[FeatureRow],
        prediction_date: NaiveDate,
    ) -> Result<usize> {
        let scores = self.score(rows)?;
        let predictions: Vec<RiskPrediction> = rows
            .iter()
            .zip(&scores)
            .map(|(row, &score)| RiskPrediction {
                player_id: PlayerId(row.player_id),
                prediction_date,
                risk_score: score,
                risk_category: RiskCategory::from_score(score),
                model_version: self.artifact.version.clone(),
            })
            .collect();

        let written = db.insert_predictions(&predictions)?;
        info!("published {} predictions for {}", written, prediction_date);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForestConfig, RandomForest};
    use ndarray::{Array1, Array2};

    fn fitted_artifact() -> ModelArtifact {
        let n = 60;
        let mut flat = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let injured = i % 3 == 0;
            let jitter = (i % 5) as f64 * 0.02;
            if injured {
                flat.extend_from_slice(&[13.0 + jitter, 1.9, 0.85, 0.45, 0.9]);
                labels.push(1);
            } else {
                flat.extend_from_slice(&[7.0 + jitter, 1.0, 0.7, 0.85, 0.3]);
                labels.push(0);
            }
        }
        let x = Array2::from_shape_vec((n, 5), flat).unwrap();
        let y = Array1::from_vec(labels);

        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 15,
            max_depth: 5,
            min_weight_split: 2.0,
            min_weight_leaf: 1.0,
            seed: 42,
        });
        forest.fit(&x, &y).unwrap();
        ModelArtifact::new("v1.0", forest)
    }

    fn feature_row(player_id: i64, high_risk: bool) -> FeatureRow {
        FeatureRow {
            player_id,
            player_name: format!("Player {}", player_id),
            position: "SF".into(),
            training_load_hours: if high_risk { 13.0 } else { 7.0 },
            workload_ratio: if high_risk { 1.9 } else { 1.0 },
            intensity_avg: if high_risk { 0.85 } else { 0.7 },
            recovery_score: if high_risk { 0.45 } else { 0.85 },
            fatigue_level: if high_risk { 0.9 } else { 0.3 },
            avg_load_4week: 8.0,
            injury_occurred: 0,
        }
    }

    fn seeded_db(player_ids: &[i64]) -> Database {
        let db = Database::in_memory().unwrap();
        for &id in player_ids {
            let player = db
                .insert_player(
                    &format!("Player {}", id),
                    "Hawks",
                    "SF",
                    200.0,
                    110.0,
                    25,
                )
                .unwrap();
            assert_eq!(player.id.0, id);
        }
        db
    }

    #[test]
    fn test_score_orders_risk_sensibly() {
        let scorer = Scorer::from_artifact(fitted_artifact());
        let rows = vec![feature_row(1, true), feature_row(2, false)];
        let scores = scorer.score(&rows).unwrap();
        assert!(scores[0] > scores[1]);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_score_rejects_empty_input() {
        let scorer = Scorer::from_artifact(fitted_artifact());
        assert!(matches!(scorer.score(&[]), Err(RiskError::NoData)));
    }

    #[test]
    fn test_publish_writes_one_row_per_player() {
        let db = seeded_db(&[1, 2]);
        let scorer = Scorer::from_artifact(fitted_artifact());
        let rows = vec![feature_row(1, true), feature_row(2, false)];
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let written = scorer.publish(&db, &rows, date).unwrap();
        assert_eq!(written, 2);

        let stored = db.get_predictions(PlayerId(1)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].prediction_date, date);
        assert_eq!(stored[0].model_version, "v1.0");
        assert_eq!(
            stored[0].risk_category,
            RiskCategory::from_score(stored[0].risk_score)
        );
    }

    #[test]
    fn test_publish_appends_instead_of_replacing() {
        let db = seeded_db(&[1]);
        let scorer = Scorer::from_artifact(fitted_artifact());
        let rows = vec![feature_row(1, true)];
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        scorer.publish(&db, &rows, date).unwrap();
        scorer.publish(&db, &rows, date).unwrap();
        assert_eq!(db.prediction_count().unwrap(), 2);
    }
}
