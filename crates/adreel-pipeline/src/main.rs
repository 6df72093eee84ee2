//! Ad reel render CLI.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adreel_models::AspectRatio;
use adreel_pipeline::{
    metrics, GeminiConfig, GeminiScriptGenerator, HttpSpeechClient, PipelineConfig,
    PipelineOrchestrator, ProductBrief, RenderRequest, SpeechConfig,
};
use adreel_providers::{ProviderRegistry, ProvidersConfig};

#[derive(Debug, Parser)]
#[command(name = "adreel", version, about = "Render vertical video ads from product images")]
struct Cli {
    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one ad and print the result as JSON
    Render {
        #[arg(long)]
        product: String,
        /// Source image, repeat 1 to 5 times in playback order
        #[arg(long = "image", required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        audience: Option<String>,
        /// Total duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// 9:16, 16:9 or 1:1
        #[arg(long)]
        aspect: Option<AspectRatio>,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // TLS for every HTTPS client in the process
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        metrics::init_prometheus(addr).context("failed to start metrics exporter")?;
        info!(%addr, "Serving metrics");
    }

    match cli.command {
        Command::Render {
            product,
            images,
            description,
            audience,
            duration,
            aspect,
        } => {
            let config = PipelineConfig::from_env();
            info!("Pipeline config: {:?}", config);

            let registry = ProviderRegistry::from_config(&ProvidersConfig::from_env())
                .context("failed to build clip provider registry")?;
            info!(providers = ?registry.kinds(), "Clip providers registered");

            let script = GeminiScriptGenerator::new(&GeminiConfig::from_env())
                .context("script generator unavailable")?;
            let speech = HttpSpeechClient::new(&SpeechConfig::from_env())
                .context("speech client unavailable")?;

            let orchestrator = PipelineOrchestrator::new(
                config,
                Arc::new(registry),
                Arc::new(script),
                Arc::new(speech),
            );

            let mut brief = ProductBrief::new(product);
            brief.description = description;
            brief.audience = audience;
            let mut request = RenderRequest::new(brief, images);
            if let Some(seconds) = duration {
                request = request.with_total_duration(seconds);
            }
            if let Some(aspect) = aspect {
                request = request.with_aspect_ratio(aspect);
            }

            let result = orchestrator.run(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.is_completed() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
