//! mediaq CLI: run the ingestion server or push a single image by hand.

use clap::{Parser, Subcommand};
use mediaq::config::Config;
use mediaq::engine::{EngineConfig, TaskEngine};
use mediaq::ingest::{IngestOptions, Ingestor};
use mediaq::model::{IngestOutcome, IngestRequest};
use mediaq::provider::{GraphqlProvider, ProviderConfig};
use mediaq::server::{AppState, start_server};
use mediaq::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediaq", about = "Rate-limited image ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP front door
    Serve {
        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Maximum concurrent ingestions (overrides MAX_CONCURRENT)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Ingest one image and wait for the outcome
    Ingest {
        /// Local path, URL, or data:image/... payload
        input: String,
        /// Target entity ID
        target_id: String,
        /// Alt text
        #[arg(long, default_value = "")]
        alt: String,
    },
    /// Upload a local file in a single attempt
    Upload {
        path: PathBuf,
        /// Target entity ID
        target_id: String,
        /// Alt text
        #[arg(long, default_value = "")]
        alt: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "mediaq".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Serve {
            port,
            max_concurrent,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(max_concurrent) = max_concurrent {
                anyhow::ensure!(max_concurrent > 0, "--max-concurrent must be at least 1");
                config.max_concurrent = max_concurrent;
            }
            cmd_serve(&config).await
        }
        Command::Ingest {
            input,
            target_id,
            alt,
        } => cmd_ingest(&config, IngestRequest::new(input, target_id, alt)).await,
        Command::Upload {
            path,
            target_id,
            alt,
        } => cmd_upload(&config, path, target_id, alt).await,
    }
}

fn build_ingestor(config: &Config) -> anyhow::Result<Ingestor> {
    let engine = TaskEngine::with_config(EngineConfig {
        concurrency_limit: config.max_concurrent,
        queue_capacity: Some(config.queue_capacity),
    })?;
    let provider = GraphqlProvider::new(ProviderConfig::from_config(config))?;
    Ok(Ingestor::new(
        engine,
        Arc::new(provider),
        IngestOptions::from_config(config),
        None,
    )?)
}

async fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let ingestor = build_ingestor(config)?;
    tracing::info!(
        store = %config.store_domain,
        max_concurrent = config.max_concurrent,
        remote_urls = %config.remote_urls,
        "starting mediaq"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    tokio::select! {
        result = start_server(&addr, AppState { ingestor }) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}

async fn cmd_ingest(config: &Config, request: IngestRequest) -> anyhow::Result<()> {
    let ingestor = build_ingestor(config)?;
    match ingestor.ingest(request).await?.await? {
        IngestOutcome::Attached { resource_url } => {
            println!("Attached: {resource_url}");
            Ok(())
        }
        IngestOutcome::Abandoned { attempts, error } => {
            anyhow::bail!("abandoned after {attempts} attempt(s): {error}")
        }
    }
}

async fn cmd_upload(
    config: &Config,
    path: PathBuf,
    target_id: String,
    alt: String,
) -> anyhow::Result<()> {
    let ingestor = build_ingestor(config)?;
    let resource_url = ingestor.upload_file(path, target_id, alt)?.await?;
    println!("Uploaded: {resource_url}");
    Ok(())
}
