use anyhow::{Context, Result};
use background_service::{BackgroundService, Pipeline};
use chrono::Utc;
use clap::{Parser, Subcommand};
use painpoint_core::{AppConfig, CoreError, ErrorReporter, IdeaQuery, Source};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "painpoint=info,source_client=info,background_service=info,database=info";

#[derive(Parser)]
#[command(name = "painpoint", about = "Collect and rank pain points from Reddit and Hacker News")]
struct Cli {
    /// Path to config TOML file; defaults apply when omitted
    #[arg(long, env = "PAINPOINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync pass over all sources
    Sync,
    /// Write today's keyword snapshots
    Snapshot,
    /// List stored ideas, best pain points first
    Ideas {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// reddit or hackernews
        #[arg(long)]
        source: Option<Source>,
        #[arg(long)]
        subreddit: Option<String>,
        /// Only posts from the last N days
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        min_pain_score: Option<i64>,
        #[arg(long)]
        pain_only: bool,
    },
    /// Keyword trends over a window
    Trends {
        #[arg(long)]
        days: Option<i64>,
    },
    /// Headline numbers
    Dashboard,
    /// Sync on a schedule until interrupted
    Run,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let result = run(Cli::parse()).await;
    if let Err(e) = &result {
        if let Some(core) = e.downcast_ref::<CoreError>() {
            ErrorReporter::new().report_error(core);
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = Pipeline::build(&config)
        .await
        .context("Failed to start pipeline")?;

    match cli.command {
        Command::Sync => {
            let report = pipeline.sync.run_sync_pass().await;
            tracing::info!("{}", report.summary());
            print_json(&report)?;
        }
        Command::Snapshot => {
            let report = pipeline.snapshots.run(Utc::now()).await?;
            print_json(&report)?;
        }
        Command::Ideas {
            limit,
            offset,
            source,
            subreddit,
            days,
            min_pain_score,
            pain_only,
        } => {
            let query = IdeaQuery {
                limit,
                offset,
                source,
                subreddit,
                days,
                min_pain_score,
                pain_only,
            };
            print_json(&pipeline.queries.query_ideas(&query).await?)?;
        }
        Command::Trends { days } => {
            print_json(&pipeline.queries.query_trends(days).await?)?;
        }
        Command::Dashboard => {
            print_json(&pipeline.queries.dashboard().await?)?;
        }
        Command::Run => {
            tracing::info!("Starting painpoint scheduler");
            let service = Arc::new(BackgroundService::new(
                pipeline.sync.clone(),
                pipeline.snapshots.clone(),
                config.scheduler.sync_interval_minutes,
            ));

            let runner = service.clone();
            let handle = tokio::spawn(async move { runner.start().await });

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutdown requested");
            service.stop();
            handle.await?;
        }
    }

    pipeline.db.close().await;
    Ok(())
}
