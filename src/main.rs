use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use retail_pipeline::api::{self, ApiState, RetailRepository};
use retail_pipeline::config::{DbConfig, ServerConfig, SourceConfig};
use retail_pipeline::db::init_pool;
use retail_pipeline::ingestion::{
    CsvConnector, EntityOutcome, HttpConnector, IngestionOptions, IngestionOrchestrator,
    IngestionReport, IngestionStatus, LoadStrategy, PgSink, SourceConnector,
};
use retail_pipeline::{Entity, Pagination};

#[derive(Parser)]
#[command(name = "retail-pipeline")]
#[command(about = "Load retail flat files or API pages into PostgreSQL and serve them back")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the one-shot ingestion job over the entity list
    Ingest(IngestArgs),
    /// Start the read API
    Serve(ServeArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    File,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Copy,
    Insert,
}

#[derive(clap::Args)]
struct IngestArgs {
    /// Where batches come from
    #[arg(long, value_enum, default_value = "file")]
    source: SourceKind,

    /// Target schema namespace (default: public for file, apis for http)
    #[arg(long)]
    schema: Option<String>,

    /// Directory holding <entity>.csv files (or set DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL of the source API (or set SOURCE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Rows per entity to request
    #[arg(long)]
    limit: Option<i64>,

    /// Rows to skip per entity
    #[arg(long)]
    offset: Option<i64>,

    /// Load transport (default: copy for file, insert for http)
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Restrict the run to these entities
    #[arg(long = "entity")]
    entities: Vec<String>,
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Schema namespace to read from (or set API_SCHEMA)
    #[arg(long)]
    schema: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Ingest(ingest) => run_ingest(ingest).await,
        Command::Serve(serve) => run_serve(serve).await,
    }
}

async fn run_ingest(args: IngestArgs) -> Result<()> {
    let db_config = DbConfig::from_env().context("Failed to read database settings")?;
    let source_config = SourceConfig::from_env();

    let entities = if args.entities.is_empty() {
        Entity::ALL.to_vec()
    } else {
        args.entities
            .iter()
            .map(|e| e.parse::<Entity>())
            .collect::<retail_pipeline::Result<Vec<_>>>()?
    };
    let page = if args.limit.is_some() || args.offset.is_some() {
        Some(Pagination::new(args.limit, args.offset)?)
    } else {
        None
    };

    let (connector, namespace, strategy): (Box<dyn SourceConnector>, String, LoadStrategy) =
        match args.source {
            SourceKind::File => {
                let dir = args.data_dir.unwrap_or(source_config.data_dir);
                (
                    Box::new(CsvConnector::new(dir)) as Box<dyn SourceConnector>,
                    args.schema.unwrap_or_else(|| "public".to_string()),
                    LoadStrategy::Copy,
                )
            }
            SourceKind::Http => {
                let url = args.api_url.unwrap_or(source_config.api_url);
                (
                    Box::new(HttpConnector::new(url)?) as Box<dyn SourceConnector>,
                    args.schema.unwrap_or_else(|| "apis".to_string()),
                    LoadStrategy::Insert,
                )
            }
        };
    let strategy = match args.strategy {
        Some(StrategyArg::Copy) => LoadStrategy::Copy,
        Some(StrategyArg::Insert) => LoadStrategy::Insert,
        None => strategy,
    };

    let pool = init_pool(&db_config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let sink = Arc::new(PgSink::new(pool.clone(), &namespace, strategy));
    let orchestrator = IngestionOrchestrator::new(sink);

    let report = orchestrator
        .run(connector.as_ref(), &IngestionOptions { entities, page })
        .await;
    pool.close().await;

    print_report(&report);
    if report.status == IngestionStatus::Failed {
        anyhow::bail!("every entity failed to ingest");
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let db_config = DbConfig::from_env().context("Failed to read database settings")?;
    let mut server_config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if let Some(schema) = args.schema {
        server_config.schema = schema;
    }

    let pool = init_pool(&db_config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let state = ApiState::new(RetailRepository::new(pool, server_config.schema.clone()));

    info!("Starting Retail Data API...");
    api::start_server(&server_config, state).await?;
    Ok(())
}

fn print_report(report: &IngestionReport) {
    println!("\n=== Ingestion {} ({:?}) ===", report.run_id, report.status);
    println!("Source: {}", report.source);
    for entry in &report.entities {
        let name = entry.entity.table_name();
        match &entry.outcome {
            EntityOutcome::Loaded { table, rows, loaded_at } => {
                println!("  {:<13} loaded {} rows into {} at {}", name, rows, table, loaded_at)
            }
            EntityOutcome::Skipped { reason } => {
                println!("  {:<13} skipped: {}", name, reason)
            }
            EntityOutcome::Failed { stage, error: err } => {
                error!("{} failed during {:?}: {}", entry.entity, stage, err);
                println!("  {:<13} FAILED ({:?}): {}", name, stage, err)
            }
        }
    }
    println!("Total rows loaded: {}", report.rows_loaded());
}
