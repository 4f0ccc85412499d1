//! SQLite storage for player, workload and prediction data

use crate::{
    GameStatRecord, InjuryEvent, Player, PlayerId, Result, RiskError, RiskPrediction,
    RiskCategory, Severity, TrainingMetricRecord,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const DATE_FMT: &str = "%Y-%m-%d";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                player_id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_name TEXT NOT NULL,
                team TEXT NOT NULL,
                position TEXT NOT NULL,
                height_cm REAL NOT NULL,
                weight_kg REAL NOT NULL,
                age INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS game_stats (
                stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(player_id),
                game_date TEXT NOT NULL,
                minutes_played REAL NOT NULL,
                field_goals_attempted INTEGER NOT NULL,
                field_goals_made INTEGER NOT NULL,
                rebounds INTEGER NOT NULL,
                assists INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS training_metrics (
                metric_id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(player_id),
                week_start_date TEXT NOT NULL,
                training_load_hours REAL NOT NULL,
                intensity_avg REAL,
                sessions_count INTEGER NOT NULL,
                recovery_score REAL,
                fatigue_level REAL,
                UNIQUE(player_id, week_start_date)
            );

            CREATE TABLE IF NOT EXISTS injury_history (
                injury_id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(player_id),
                injury_date TEXT NOT NULL,
                injury_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                recovery_days INTEGER NOT NULL,
                reinjury_risk REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS injury_predictions (
                prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(player_id),
                prediction_date TEXT NOT NULL,
                risk_score REAL NOT NULL,
                risk_category TEXT NOT NULL,
                model_version TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_game_stats_date
                ON game_stats(player_id, game_date);
            CREATE INDEX IF NOT EXISTS idx_training_metrics_date
                ON training_metrics(player_id, week_start_date);
            CREATE INDEX IF NOT EXISTS idx_injury_history_date
                ON injury_history(player_id, injury_date);
            CREATE INDEX IF NOT EXISTS idx_predictions_date
                ON injury_predictions(player_id, prediction_date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Player Operations ====================

    /// Insert a player and return it with its assigned id
    pub fn insert_player(
        &self,
        name: &str,
        team: &str,
        position: &str,
        height_cm: f64,
        weight_kg: f64,
        age: u32,
    ) -> Result<Player> {
        self.conn.execute(
            "INSERT INTO players (player_name, team, position, height_cm, weight_kg, age)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![name, team, position, height_cm, weight_kg, age],
        )?;

        let id = PlayerId(self.conn.last_insert_rowid());
        Ok(Player {
            id,
            name: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            height_cm,
            weight_kg,
            age,
        })
    }

    /// Get player by ID
    pub fn get_player(&self, id: PlayerId) -> Result<Player> {
        self.conn
            .query_row(
                "SELECT player_id, player_name, team, position, height_cm, weight_kg, age
                 FROM players WHERE player_id = ?1",
                params![id.0],
                Self::row_to_player,
            )
            .map_err(|_| RiskError::PlayerNotFound(id))
    }

    /// Get all players ordered by id
    pub fn get_players(&self) -> Result<Vec<Player>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, player_name, team, position, height_cm, weight_kg, age
             FROM players ORDER BY player_id",
        )?;

        let players = stmt
            .query_map([], Self::row_to_player)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(players)
    }

    fn row_to_player(row: &rusqlite::Row) -> rusqlite::Result<Player> {
        Ok(Player {
            id: PlayerId(row.get(0)?),
            name: row.get(1)?,
            team: row.get(2)?,
            position: row.get(3)?,
            height_cm: row.get(4)?,
            weight_kg: row.get(5)?,
            age: row.get(6)?,
        })
    }

    // ==================== Game Stat Operations ====================

    /// Insert a game stat line
    pub fn insert_game_stat(&self, stat: &GameStatRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO game_stats (player_id, game_date, minutes_played,
                field_goals_attempted, field_goals_made, rebounds, assists)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stat.player_id.0,
                stat.game_date.format(DATE_FMT).to_string(),
                stat.minutes_played,
                stat.field_goals_attempted,
                stat.field_goals_made,
                stat.rebounds,
                stat.assists,
            ],
        )?;
        Ok(())
    }

    /// Get all game stats for a player, ordered by date
    pub fn get_game_stats(&self, player_id: PlayerId) -> Result<Vec<GameStatRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, game_date, minutes_played, field_goals_attempted,
                    field_goals_made, rebounds, assists
             FROM game_stats WHERE player_id = ?1 ORDER BY game_date",
        )?;

        let stats = stmt
            .query_map(params![player_id.0], |row| {
                let date_str: String = row.get(1)?;
                Ok(GameStatRecord {
                    player_id: PlayerId(row.get(0)?),
                    game_date: parse_date(&date_str),
                    minutes_played: row.get(2)?,
                    field_goals_attempted: row.get(3)?,
                    field_goals_made: row.get(4)?,
                    rebounds: row.get(5)?,
                    assists: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    // ==================== Training Metric Operations ====================

    /// Insert one weekly training record.
    ///
    /// The (player, week) uniqueness invariant is enforced by the schema;
    /// violating it surfaces as a database error.
    pub fn insert_training_metric(&self, metric: &TrainingMetricRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO training_metrics (player_id, week_start_date, training_load_hours,
                intensity_avg, sessions_count, recovery_score, fatigue_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                metric.player_id.0,
                metric.week_start_date.format(DATE_FMT).to_string(),
                metric.training_load_hours,
                metric.intensity_avg,
                metric.sessions_count,
                metric.recovery_score,
                metric.fatigue_level,
            ],
        )?;
        Ok(())
    }

    /// Get all training metrics, ordered by (player_id, week_start_date)
    pub fn get_training_metrics(&self) -> Result<Vec<TrainingMetricRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, week_start_date, training_load_hours, intensity_avg,
                    sessions_count, recovery_score, fatigue_level
             FROM training_metrics ORDER BY player_id, week_start_date",
        )?;

        let metrics = stmt
            .query_map([], |row| {
                let date_str: String = row.get(1)?;
                Ok(TrainingMetricRecord {
                    player_id: PlayerId(row.get(0)?),
                    week_start_date: parse_date(&date_str),
                    training_load_hours: row.get(2)?,
                    intensity_avg: row.get(3)?,
                    sessions_count: row.get(4)?,
                    recovery_score: row.get(5)?,
                    fatigue_level: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    // ==================== Injury Operations ====================

    /// Insert an injury event
    pub fn insert_injury(&self, injury: &InjuryEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO injury_history (player_id, injury_date, injury_type, severity,
                recovery_days, reinjury_risk)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                injury.player_id.0,
                injury.injury_date.format(DATE_FMT).to_string(),
                injury.injury_type,
                injury.severity.code(),
                injury.recovery_days,
                injury.reinjury_risk,
            ],
        )?;
        Ok(())
    }

    /// Get all injury events, ordered by (player_id, injury_date)
    pub fn get_injuries(&self) -> Result<Vec<InjuryEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, injury_date, injury_type, severity, recovery_days, reinjury_risk
             FROM injury_history ORDER BY player_id, injury_date",
        )?;

        let injuries = stmt
            .query_map([], |row| {
                let date_str: String = row.get(1)?;
                let severity_str: String = row.get(3)?;
                Ok(InjuryEvent {
                    player_id: PlayerId(row.get(0)?),
                    injury_date: parse_date(&date_str),
                    injury_type: row.get(2)?,
                    severity: Severity::from_code(&severity_str).unwrap_or(Severity::Minor),
                    recovery_days: row.get(4)?,
                    reinjury_risk: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(injuries)
    }

    // ==================== Prediction Operations ====================

    /// Insert a batch of risk predictions inside a single transaction.
    ///
    /// Append-only: re-running a scoring pass adds new rows, prior rows are
    /// never updated. Returns the number of rows written; on error nothing
    /// is committed.
    pub fn insert_predictions(&self, predictions: &[RiskPrediction]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO injury_predictions
                    (player_id, prediction_date, risk_score, risk_category, model_version)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for pred in predictions {
                stmt.execute(params![
                    pred.player_id.0,
                    pred.prediction_date.format(DATE_FMT).to_string(),
                    pred.risk_score,
                    pred.risk_category.code(),
                    pred.model_version,
                ])?;
            }
        }
        tx.commit()?;
        Ok(predictions.len())
    }

    /// Get all predictions for a player, ordered by insertion
    pub fn get_predictions(&self, player_id: PlayerId) -> Result<Vec<RiskPrediction>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, prediction_date, risk_score, risk_category, model_version
             FROM injury_predictions WHERE player_id = ?1 ORDER BY prediction_id",
        )?;

        let predictions = stmt
            .query_map(params![player_id.0], |row| {
                let date_str: String = row.get(1)?;
                let category_str: String = row.get(3)?;
                Ok(RiskPrediction {
                    player_id: PlayerId(row.get(0)?),
                    prediction_date: parse_date(&date_str),
                    risk_score: row.get(2)?,
                    risk_category: RiskCategory::from_code(&category_str)
                        .unwrap_or(RiskCategory::Low),
                    model_version: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(predictions)
    }

    /// Total prediction rows stored
    pub fn prediction_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM injury_predictions", [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };

        let min_week: Option<String> = self
            .conn
            .query_row(
                "SELECT MIN(week_start_date) FROM training_metrics",
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let max_week: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(week_start_date) FROM training_metrics",
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            player_count: count("players")?,
            game_stat_count: count("game_stats")?,
            training_metric_count: count("training_metrics")?,
            injury_count: count("injury_history")?,
            prediction_count: count("injury_predictions")?,
            earliest_week: min_week.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok()),
            latest_week: max_week.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok()),
        })
    }
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub player_count: usize,
    pub game_stat_count: usize,
    pub training_metric_count: usize,
    pub injury_count: usize,
    pub prediction_count: usize,
    pub earliest_week: Option<NaiveDate>,
    pub latest_week: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.player_count, 0);
        assert_eq!(stats.training_metric_count, 0);
        assert_eq!(stats.prediction_count, 0);
    }

    #[test]
    fn test_insert_player() {
        let db = Database::in_memory().unwrap();
        let player = db
            .insert_player("Ava Carter", "Hawks", "PG", 185.4, 85.7, 26)
            .unwrap();
        assert_eq!(player.name, "Ava Carter");

        let fetched = db.get_player(player.id).unwrap();
        assert_eq!(fetched.position, "PG");
        assert_eq!(fetched.age, 26);
    }

    #[test]
    fn test_training_metric_week_uniqueness() {
        let db = Database::in_memory().unwrap();
        let player = db
            .insert_player("Ava Carter", "Hawks", "PG", 185.4, 85.7, 26)
            .unwrap();

        let metric = TrainingMetricRecord {
            player_id: player.id,
            week_start_date: date(2024, 1, 1),
            training_load_hours: 10.0,
            intensity_avg: Some(0.8),
            sessions_count: 5,
            recovery_score: Some(0.7),
            fatigue_level: Some(0.4),
        };
        db.insert_training_metric(&metric).unwrap();

        // Second record for the same player/week must be rejected
        assert!(db.insert_training_metric(&metric).is_err());
        assert_eq!(db.get_training_metrics().unwrap().len(), 1);
    }

    #[test]
    fn test_metrics_ordered_by_player_then_week() {
        let db = Database::in_memory().unwrap();
        let p1 = db.insert_player("A", "T", "PG", 180.0, 80.0, 25).unwrap();
        let p2 = db.insert_player("B", "T", "SG", 190.0, 90.0, 27).unwrap();

        for (pid, week) in [
            (p2.id, date(2024, 1, 8)),
            (p1.id, date(2024, 1, 8)),
            (p2.id, date(2024, 1, 1)),
            (p1.id, date(2024, 1, 1)),
        ] {
            db.insert_training_metric(&TrainingMetricRecord {
                player_id: pid,
                week_start_date: week,
                training_load_hours: 9.0,
                intensity_avg: Some(0.7),
                sessions_count: 4,
                recovery_score: Some(0.6),
                fatigue_level: Some(0.5),
            })
            .unwrap();
        }

        let metrics = db.get_training_metrics().unwrap();
        let keys: Vec<_> = metrics
            .iter()
            .map(|m| (m.player_id, m.week_start_date))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_predictions_append_only() {
        let db = Database::in_memory().unwrap();
        let player = db.insert_player("A", "T", "PG", 180.0, 80.0, 25).unwrap();

        let pred = RiskPrediction {
            player_id: player.id,
            prediction_date: date(2024, 6, 1),
            risk_score: 0.42,
            risk_category: RiskCategory::Medium,
            model_version: "v1.0".to_string(),
        };

        assert_eq!(db.insert_predictions(&[pred.clone()]).unwrap(), 1);
        assert_eq!(db.insert_predictions(&[pred]).unwrap(), 1);

        // Same key twice: both rows retained
        assert_eq!(db.prediction_count().unwrap(), 2);
        let stored = db.get_predictions(player.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].risk_category, RiskCategory::Medium);
    }

    #[test]
    fn test_game_stat_roundtrip() {
        let db = Database::in_memory().unwrap();
        let player = db.insert_player("A", "T", "C", 210.0, 115.0, 28).unwrap();

        db.insert_game_stat(&GameStatRecord {
            player_id: player.id,
            game_date: date(2024, 2, 10),
            minutes_played: 31.5,
            field_goals_attempted: 14,
            field_goals_made: 8,
            rebounds: 11,
            assists: 3,
        })
        .unwrap();

        let stats = db.get_game_stats(player.id).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].rebounds, 11);
        assert_eq!(stats[0].game_date, date(2024, 2, 10));
    }

    #[test]
    fn test_injury_roundtrip() {
        let db = Database::in_memory().unwrap();
        let player = db.insert_player("A", "T", "PF", 200.0, 100.0, 30).unwrap();

        db.insert_injury(&InjuryEvent {
            player_id: player.id,
            injury_date: date(2024, 3, 15),
            injury_type: "Hamstring".to_string(),
            severity: Severity::Moderate,
            recovery_days: 14,
            reinjury_risk: 0.3,
        })
        .unwrap();

        let injuries = db.get_injuries().unwrap();
        assert_eq!(injuries.len(), 1);
        assert_eq!(injuries[0].severity, Severity::Moderate);
        assert_eq!(injuries[0].injury_date, date(2024, 3, 15));
    }
}
