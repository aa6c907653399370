//! hybrid-feed - federated social feed over a relational and a document store
//!
//! `hybrid-feed` (or `hybrid-feed report`) opens one connection to each store,
//! runs the timeline, engagement, activity, preference and hybrid feed reads,
//! prints them, and closes both connections on every exit path.
//! `hybrid-feed seed` initializes the document store collections.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hybrid_common::config::{parse_flag, ConfigLayer, DocumentLayer, FederationConfig, RelationalLayer};
use hybrid_feed::render::render_report;
use hybrid_feed::store::{MongoConnector, MySqlConnector, StoreConnector, StoreHandle};
use hybrid_feed::{run_report, with_session, ReportOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for hybrid-feed
#[derive(Parser, Debug)]
#[command(name = "hybrid-feed")]
#[command(about = "Federated social feed over MySQL and MongoDB")]
#[command(version)]
struct Args {
    /// Optional TOML configuration file
    #[arg(long, env = "HYBRID_FEED_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "MYSQL_HOST")]
    mysql_host: Option<String>,

    #[arg(long, env = "MYSQL_PORT")]
    mysql_port: Option<u16>,

    #[arg(long, env = "MYSQL_USER")]
    mysql_user: Option<String>,

    #[arg(long, env = "MYSQL_ROOT_PASSWORD", hide_env_values = true)]
    mysql_password: Option<String>,

    #[arg(long, env = "MYSQL_DATABASE")]
    mysql_database: Option<String>,

    #[arg(long, env = "MONGO_HOST")]
    mongo_host: Option<String>,

    #[arg(long, env = "MONGO_PORT")]
    mongo_port: Option<u16>,

    #[arg(long, env = "MONGO_INITDB_ROOT_USERNAME")]
    mongo_username: Option<String>,

    #[arg(long, env = "MONGO_INITDB_ROOT_PASSWORD", hide_env_values = true)]
    mongo_password: Option<String>,

    #[arg(long, env = "MONGO_DATABASE")]
    mongo_database: Option<String>,

    #[arg(long, env = "MONGO_AUTH_SOURCE")]
    mongo_auth_source: Option<String>,

    /// Whether the document store requires authentication (true/false, 1/0, yes/no, on/off)
    #[arg(long, env = "MONGO_AUTH", value_parser = parse_auth_flag)]
    mongo_auth: Option<bool>,

    /// Output format for the report
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run every read and print the federated report (default)
    Report,
    /// Clear and repopulate the document store collections
    Seed,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

fn parse_auth_flag(value: &str) -> std::result::Result<bool, String> {
    parse_flag(value).map_err(|e| e.to_string())
}

impl Args {
    /// CLI/environment values as the highest-priority configuration layer
    fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            relational: RelationalLayer {
                host: self.mysql_host.clone(),
                port: self.mysql_port,
                user: self.mysql_user.clone(),
                password: self.mysql_password.clone(),
                database: self.mysql_database.clone(),
            },
            document: DocumentLayer {
                host: self.mongo_host.clone(),
                port: self.mongo_port,
                username: self.mongo_username.clone(),
                password: self.mongo_password.clone(),
                database: self.mongo_database.clone(),
                auth_source: self.mongo_auth_source.clone(),
                auth: self.mongo_auth,
            },
        }
    }

    fn resolve_config(&self) -> hybrid_common::Result<FederationConfig> {
        let file = match &self.config {
            Some(path) => Some(ConfigLayer::load(path)?),
            None => None,
        };
        FederationConfig::resolve(file, self.overrides())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting hybrid-feed v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e).context("Failed to load configuration");
        }
    };

    let outcome = match args.command.unwrap_or(Command::Report) {
        Command::Report => report(&config, args.format).await,
        Command::Seed => seed(&config).await,
    };

    match outcome {
        Ok(()) => {
            info!("Application finished successfully");
            Ok(())
        }
        Err(e) => {
            error!("Fatal application error: {:#}", e);
            Err(e)
        }
    }
}

async fn report(config: &FederationConfig, format: OutputFormat) -> Result<()> {
    let relational = MySqlConnector::new(config.relational.clone());
    let document = MongoConnector::new(config.document.clone());
    let options = ReportOptions::default();

    let report = with_session(&relational, &document, move |session| {
        Box::pin(async move { run_report(session, &options).await })
    })
    .await
    .context("Hybrid report failed")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => render_report(&report, &mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

async fn seed(config: &FederationConfig) -> Result<()> {
    let connector = MongoConnector::new(config.document.clone());
    info!("Connecting to document store at {}", connector.endpoint());
    let mut store = connector
        .open()
        .await
        .context("Failed to connect to document store")?;

    let outcome = store.seed().await;
    if let Err(e) = store.release().await {
        error!("Failed to close document store connection: {}", e);
    }

    let summary = outcome.context("Document store initialization failed")?;
    info!(
        "Document store initialization completed ({} activities, {} preferences)",
        summary.activities, summary.preferences
    );
    Ok(())
}
