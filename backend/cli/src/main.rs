mod api;
mod config;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use docextract_config::{config_file_path, load_and_prepare, redact, PipelineConfig};
use docextract_core::ExtractionRequest;
use docextract_logging::init_logger;
use docextract_pipeline::{check_services, recommend_config, ExtractionPipeline};

use api::AppState;
use config::ServerConfig;

#[derive(Parser)]
#[command(name = "docextract")]
#[command(about = "Extract text from uploaded documents and images")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $DOCEXTRACT_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction pipeline on one file
    Extract {
        path: PathBuf,
        /// Declared MIME type; sniffed from content when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Minimum trimmed characters for a result to be accepted
        #[arg(long)]
        min_length: Option<usize>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the method chain that would be used for a file
    Recommend { path: PathBuf },
    /// Check which extraction backends are reachable
    Health,
    /// Print the effective configuration with secrets masked
    Config,
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let config = load_and_prepare(&config_path)
        .await
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    init_logger(&config.logging.dir, &config.logging.level);

    match cli.command {
        Commands::Extract { path, mime, min_length, json } => {
            let pipeline = ExtractionPipeline::from_config(&config);
            let request = read_request(&path, mime.as_deref()).await?;

            let result = match min_length {
                None => pipeline.extract(&request).await.as_ref().clone(),
                Some(min) => {
                    let selected = recommend_config(&request).with_min_text_length(min);
                    pipeline.extract_with(&request, &selected).await
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                terminal_output::print_result(&result);
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Recommend { path } => {
            let request = read_request(&path, None).await?;
            terminal_output::note_info(&format!(
                "{} detected as {} ({} bytes)",
                request.file_name(),
                request.mime_type(),
                request.len()
            ));
            println!("{}", serde_json::to_string_pretty(&recommend_config(&request))?);
        }
        Commands::Health => {
            let health = check_services(&config).await;
            if !health.any_available() {
                terminal_output::note_warn("no extraction backend is available; only PDF text layers and plain text will work");
            }
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&redact(&config))?);
        }
        Commands::Serve { port } => {
            let server = ServerConfig::from_env();
            let server = ServerConfig {
                port: port.unwrap_or(server.port),
                ..server
            };
            run_server(server, config).await?;
        }
    }

    Ok(())
}

async fn read_request(path: &Path, mime: Option<&str>) -> Result<ExtractionRequest> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ExtractionRequest::new(bytes, mime.unwrap_or(""), file_name))
}

async fn run_server(server: ServerConfig, config: PipelineConfig) -> Result<()> {
    info!(
        port = server.port,
        bind = %server.bind_address,
        vision = config.vision_enabled(),
        external_ocr = config.ocr_enabled(),
        ai = config.ai_enabled(),
        "Starting docextract server"
    );

    let state = Arc::new(AppState {
        pipeline: ExtractionPipeline::from_config(&config),
        config,
    });

    let app = api::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(server.addr())
        .await
        .with_context(|| format!("binding {}", server.addr()))?;
    info!("Server listening on {}", server.addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
