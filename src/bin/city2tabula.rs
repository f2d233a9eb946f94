//! # City2TABULA
//!
//! Command-line entry point: validates configuration and runs feature extraction.

use anyhow::{Context, Result};
use city2tabula::config::ConfigManager;
use city2tabula::database::{
    CityDbIdentifierSource, DatabaseConnection, SqlScriptCatalog, SqlStageExecutor,
};
use city2tabula::logging::init_structured_logging;
use city2tabula::orchestration::FeatureExtractionOrchestrator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "city2tabula")]
#[command(about = "Extract building features from CityDB and match them to TABULA")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory path (default: config)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment to load (development, test, production); defaults to C2T_ENV
    #[arg(short, long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run feature extraction for every configured level
    ExtractFeatures {
        /// Write the run result as JSON to this path
        #[arg(long)]
        json_report: Option<PathBuf>,
    },

    /// Load and validate configuration, then print it with secrets masked
    ValidateConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("❌ {e:#}");
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

/// Returns whether the command succeeded
async fn run(cli: Cli) -> Result<bool> {
    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir, &environment)
        .context("failed to load configuration")?;

    match cli.command {
        Commands::ValidateConfig => {
            println!("✅ Configuration for '{}' is valid", manager.environment());
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            Ok(true)
        }
        Commands::ExtractFeatures { json_report } => {
            extract_features(&manager, json_report).await
        }
    }
}

async fn extract_features(manager: &ConfigManager, json_report: Option<PathBuf>) -> Result<bool> {
    let config = manager.config();

    let chain = SqlScriptCatalog::load(&config.sql.main_scripts_dir)
        .context("failed to load stage scripts")?
        .into_chain();
    info!(
        stages = chain.len(),
        directory = %config.sql.main_scripts_dir.display(),
        "📜 CLI: Stage chain loaded"
    );

    let connection = DatabaseConnection::connect(&config.database).await?;
    if !connection.health_check().await? {
        anyhow::bail!("database health check failed");
    }

    let source = Arc::new(CityDbIdentifierSource::new(
        connection.pool().clone(),
        config.schemas.clone(),
    ));
    let executor = Arc::new(SqlStageExecutor::new(connection.pool().clone()));

    let orchestrator = FeatureExtractionOrchestrator::new(config, chain, source, executor)?;
    let result = orchestrator.run().await?;
    result.log_summary();

    if let Some(path) = json_report {
        let json = serde_json::to_string_pretty(&result)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "📝 CLI: Run report written");
    }

    connection.close().await;

    Ok(result.is_success())
}
