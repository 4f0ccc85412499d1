//! Injury Risk Prediction CLI
//!
//! Predicts weekly injury risk for athletes from their training workload history.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use riskwatch::{Config, Result};

#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(about = "Athlete injury risk prediction from training workload", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build the weekly feature table from stored training data
    Features,
    /// Train the injury risk model and report evaluation metrics
    Train,
    /// Score the latest features and store one prediction per player
    Score {
        /// Prediction date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Populate the database with synthetic players and training history
    Seed,
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Seed => commands::data_seed(&config),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features => commands::build_features(&config),
        Commands::Train => commands::train(&config),
        Commands::Score { date } => commands::score(&config, date),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::Path;

    use chrono::Local;
    use riskwatch::data::{feature_table, seed, Database};
    use riskwatch::features::FeatureBuilder;
    use riskwatch::model::ModelArtifact;
    use riskwatch::predict::Scorer;
    use riskwatch::training::Trainer;
    use riskwatch::RiskError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'riskwatch data seed' to generate training data");
        println!("  3. Run 'riskwatch features' to build the feature table");
        println!("  4. Run 'riskwatch train' to train the model");
        println!("  5. Run 'riskwatch score' to store risk predictions");

        Ok(())
    }

    pub fn data_seed(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Seeding synthetic training data...");
        let summary = seed::seed_database(&db, &config.synthetic)?;

        println!("Seed complete:");
        println!("  Players:          {}", summary.players);
        println!("  Game stats:       {}", summary.game_stats);
        println!("  Training weeks:   {}", summary.training_metrics);
        println!("  Injuries:         {}", summary.injuries);

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Players:      {}", stats.player_count);
        println!("  Game stats:   {}", stats.game_stat_count);
        println!("  Weekly rows:  {}", stats.training_metric_count);
        println!("  Injuries:     {}", stats.injury_count);
        println!("  Predictions:  {}", stats.prediction_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_week, stats.latest_week) {
            println!("  Range:        {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn build_features(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        let players = db.get_players()?;
        let metrics = db.get_training_metrics()?;
        let injuries = db.get_injuries()?;
        if metrics.is_empty() {
            return Err(RiskError::NoData);
        }

        println!("Building features from {} weekly records...", metrics.len());
        let rows = FeatureBuilder::build(&players, &metrics, &injuries)?;

        feature_table::write_features(Path::new(&config.data.features_path), &rows)?;
        let injured = rows.iter().filter(|r| r.injury_occurred == 1).count();
        println!(
            "Wrote {} feature rows ({} injury-positive) to {}",
            rows.len(),
            injured,
            config.data.features_path
        );

        Ok(())
    }

    pub fn train(config: &Config) -> Result<()> {
        let rows = feature_table::read_features(Path::new(&config.data.features_path))?;
        println!("Loaded {} feature rows", rows.len());

        let trainer = Trainer::new(config);
        let outcome = trainer.train(&rows)?;

        println!("\n{}", outcome.report);

        let model_path = Path::new(&config.data.model_path);
        ModelArtifact::new(&config.model.version, outcome.forest).save(model_path)?;
        println!("Saved model to {}", config.data.model_path);

        outcome
            .report
            .save(Path::new(&config.data.metrics_path))?;
        println!("Saved metrics to {}", config.data.metrics_path);

        Ok(())
    }

    pub fn score(config: &Config, date: Option<NaiveDate>) -> Result<()> {
        let prediction_date = date.unwrap_or_else(|| Local::now().date_naive());

        let rows = feature_table::read_features(Path::new(&config.data.features_path))?;
        if rows.is_empty() {
            return Err(RiskError::NoData);
        }

        let db = Database::open(&config.data.database_path)?;
        let scorer = Scorer::load(Path::new(&config.data.model_path))?;

        let written = scorer.publish(&db, &rows, prediction_date)?;
        println!(
            "Stored {} predictions for {} (model {})",
            written,
            prediction_date,
            scorer.model_version()
        );

        Ok(())
    }
}
