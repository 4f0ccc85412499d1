//! Synthetic data generation for a runnable demo population

use crate::data::Database;
use crate::{GameStatRecord, InjuryEvent, Result, Severity, SyntheticConfig, TrainingMetricRecord};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const INJURY_TYPES: [&str; 7] = [
    "Ankle Sprain",
    "Hamstring",
    "Knee",
    "Shoulder",
    "Lower Back",
    "Wrist",
    "Calf",
];

const TEAMS: [&str; 8] = [
    "Hawks", "Comets", "Raptors", "Storm", "Pioneers", "Sentinels", "Wolves", "Breakers",
];

const POSITIONS: [&str; 5] = ["PG", "SG", "SF", "PF", "C"];

/// Counts of rows written by a seeding run
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub players: usize,
    pub game_stats: usize,
    pub training_metrics: usize,
    pub injuries: usize,
}

/// Populate the store with a synthetic player population.
///
/// Weekly training loads cluster around 10 hours; injuries are drawn
/// independently per (player, week) at the configured rate and land on the
/// week start date, so roughly `injury_rate` of feature rows carry a
/// positive label.
pub fn seed_database(db: &Database, config: &SyntheticConfig) -> Result<SeedSummary> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut player_ids = Vec::with_capacity(config.players);
    for i in 0..config.players {
        let name = format!("Player {:02}", i + 1);
        let team = TEAMS[i % TEAMS.len()];
        let position = POSITIONS[i % POSITIONS.len()];
        let height_cm = rng.gen_range(180.0..215.0);
        let weight_kg = rng.gen_range(78.0..130.0);
        let age = rng.gen_range(20..40);

        let player = db.insert_player(&name, team, position, height_cm, weight_kg, age)?;
        player_ids.push(player.id);
    }

    let mut game_stat_count = 0;
    let mut metric_count = 0;
    let mut injury_count = 0;

    for &player_id in &player_ids {
        for week in 0..config.weeks {
            let week_start = base_date + Duration::weeks(week as i64);

            // Two games a week, midweek and weekend
            for game_offset in [2, 5] {
                let fga = rng.gen_range(5..22);
                db.insert_game_stat(&GameStatRecord {
                    player_id,
                    game_date: week_start + Duration::days(game_offset),
                    minutes_played: rng.gen_range(12.0..40.0),
                    field_goals_attempted: fga,
                    field_goals_made: rng.gen_range(0..=fga),
                    rebounds: rng.gen_range(0..14),
                    assists: rng.gen_range(0..12),
                })?;
                game_stat_count += 1;
            }

            db.insert_training_metric(&TrainingMetricRecord {
                player_id,
                week_start_date: week_start,
                // Load centered on 10h/week, bounded instead of Gaussian
                training_load_hours: rng.gen_range(6.0..14.0),
                intensity_avg: Some(rng.gen_range(0.6..0.95)),
                sessions_count: rng.gen_range(4..7),
                recovery_score: Some(rng.gen_range(0.4..0.95)),
                fatigue_level: Some(rng.gen_range(0.2..0.9)),
            })?;
            metric_count += 1;

            if rng.gen_bool(config.injury_rate) {
                let injury_type = INJURY_TYPES.choose(&mut rng).unwrap();
                let severity = *[Severity::Minor, Severity::Moderate, Severity::Severe]
                    .choose(&mut rng)
                    .unwrap();

                db.insert_injury(&InjuryEvent {
                    player_id,
                    injury_date: week_start,
                    injury_type: injury_type.to_string(),
                    severity,
                    recovery_days: rng.gen_range(3..30),
                    reinjury_risk: rng.gen_range(0.1..0.8),
                })?;
                injury_count += 1;
            }
        }
    }

    Ok(SeedSummary {
        players: player_ids.len(),
        game_stats: game_stat_count,
        training_metrics: metric_count,
        injuries: injury_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_row_counts() {
        let db = Database::in_memory().unwrap();
        let config = SyntheticConfig {
            players: 4,
            weeks: 10,
            injury_rate: 0.2,
            seed: 7,
        };

        let summary = seed_database(&db, &config).unwrap();
        assert_eq!(summary.players, 4);
        assert_eq!(summary.game_stats, 80);
        assert_eq!(summary.training_metrics, 40);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.player_count, 4);
        assert_eq!(stats.game_stat_count, 80);
        assert_eq!(stats.training_metric_count, 40);
        assert_eq!(stats.injury_count, summary.injuries);
    }

    #[test]
    fn test_seed_deterministic() {
        let config = SyntheticConfig {
            players: 3,
            weeks: 8,
            injury_rate: 0.3,
            seed: 11,
        };

        let db1 = Database::in_memory().unwrap();
        let db2 = Database::in_memory().unwrap();
        seed_database(&db1, &config).unwrap();
        seed_database(&db2, &config).unwrap();

        let m1 = db1.get_training_metrics().unwrap();
        let m2 = db2.get_training_metrics().unwrap();
        assert_eq!(m1.len(), m2.len());
        for (a, b) in m1.iter().zip(m2.iter()) {
            assert_eq!(a.training_load_hours, b.training_load_hours);
        }
        assert_eq!(
            db1.get_injuries().unwrap().len(),
            db2.get_injuries().unwrap().len()
        );
    }
}
