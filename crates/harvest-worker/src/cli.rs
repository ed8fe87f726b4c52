//! Command-line interface and command handlers

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use harvest_common::types::License;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::catalog::HttpCatalogClient;
use crate::config::{ConfigError, WorkerConfig};
use crate::db;
use crate::error::WorkerError;
use crate::seed::{self, DEFAULT_SEED_START};
use crate::shard::WorkerId;
use crate::sink::PgRecordSink;
use crate::store::{PgShardStore, ShardStore};
use crate::worker::{RunSummary, Worker};

#[derive(Parser, Debug)]
#[command(name = "harvest-worker")]
#[command(author, version, about = "Distributed catalog harvesting worker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file; environment variables override its values
    #[arg(short, long, global = true, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Claim and harvest shards until none are left
    Run,

    /// Create one shard per day and license for a date range
    Seed {
        /// First day to seed (inclusive)
        #[arg(long, default_value = DEFAULT_SEED_START)]
        from: NaiveDate,

        /// Day to stop before (exclusive); defaults to today in UTC
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Licenses to seed; repeat for several. Defaults to the Creative
        /// Commons variants.
        #[arg(long = "license", value_name = "LICENSE")]
        licenses: Vec<License>,
    },

    /// Print shard counts by claim state
    Status,

    /// Apply database migrations
    Migrate,
}

/// Execute the parsed command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let config = WorkerConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Run => {
            let summary = run(&config).await?;
            info!(shards = summary.shards(), "Run complete");
            Ok(())
        }
        Commands::Seed { from, to, licenses } => {
            let to = to.unwrap_or_else(|| Utc::now().date_naive());
            let licenses = if licenses.is_empty() {
                License::SEEDED.to_vec()
            } else {
                licenses.clone()
            };
            let created = seed_range(&config, *from, to, &licenses).await?;
            println!("Created {} shards", created);
            Ok(())
        }
        Commands::Status => {
            config.validate_database()?;
            let pool = db::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            let summary = PgShardStore::new(pool).summary().await?;
            println!("unclaimed:    {}", summary.unclaimed);
            println!("not started:  {}", summary.not_started);
            println!("in progress:  {}", summary.in_progress);
            println!("finished:     {}", summary.finished);
            println!("total:        {}", summary.total());
            Ok(())
        }
        Commands::Migrate => {
            config.validate_database()?;
            let pool = db::connect(&config.database)
                .await
                .context("Failed to connect to database")?;
            db::run_migrations(&pool).await?;
            Ok(())
        }
    }
}

/// Build the production worker from configuration and run it to completion.
pub async fn run(config: &WorkerConfig) -> Result<RunSummary, WorkerError> {
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    let store: Arc<dyn ShardStore> = Arc::new(PgShardStore::new(pool.clone()));
    let sink = Arc::new(PgRecordSink::new(pool));
    let catalog = Arc::new(
        HttpCatalogClient::from_config(&config.catalog)
            .map_err(|e| ConfigError::Invalid(format!("catalog client: {}", e)))?,
    );

    Worker::new(
        WorkerId::new(config.worker_id.clone()),
        store,
        sink,
        catalog,
        &config.harvest,
        config.catalog.page_size,
    )
    .run()
    .await
}

async fn seed_range(
    config: &WorkerConfig,
    from: NaiveDate,
    to: NaiveDate,
    licenses: &[License],
) -> Result<u64> {
    config.validate_database()?;
    let shards = seed::plan_shards(from, to, licenses)?;

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store = PgShardStore::new(pool);
    Ok(seed::seed(&store, &shards).await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_arguments_parse() {
        let cli = Cli::try_parse_from([
            "harvest-worker",
            "seed",
            "--from",
            "2016-02-06",
            "--to",
            "2016-02-08",
            "--license",
            "cc-by",
            "--license",
            "cc-by-sa",
        ])
        .unwrap();

        match cli.command {
            Commands::Seed { from, to, licenses } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2016, 2, 6).unwrap());
                assert_eq!(to, NaiveDate::from_ymd_opt(2016, 2, 8));
                assert_eq!(licenses, vec![License::CcBy, License::CcBySa]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_license_is_rejected() {
        let result = Cli::try_parse_from(["harvest-worker", "seed", "--license", "all-rights"]);
        assert!(result.is_err());
    }
}
