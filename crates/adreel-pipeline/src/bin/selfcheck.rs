//! Deployment self-check: encoder binaries, writable directories, credentials.

use std::path::Path;
use std::process::Command;

use adreel_pipeline::{GeminiConfig, PipelineConfig, SpeechConfig};
use adreel_providers::ProvidersConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();

    println!(
        "adreel-selfcheck: starting with work_dir={} output_dir={}",
        config.work_dir.display(),
        config.output_dir.display()
    );
    ensure_writable(&config.work_dir).await?;
    ensure_writable(&config.output_dir).await?;
    ensure_tool("ffmpeg")?;
    ensure_tool("ffprobe")?;
    ensure_providers(&ProvidersConfig::from_env())?;
    ensure_present("GEMINI_API_KEY", GeminiConfig::from_env().api_key.is_some())?;
    ensure_present("TTS_API_KEY", SpeechConfig::from_env().api_key.is_some())?;

    println!("adreel-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let marker = path.join(".adreel-selfcheck");
    tokio::fs::write(&marker, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn ensure_tool(name: &str) -> anyhow::Result<()> {
    let output = Command::new(name)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("{} -version failed: {:?}", name, output.status));
    }
    Ok(())
}

fn ensure_providers(config: &ProvidersConfig) -> anyhow::Result<()> {
    let configured = config.configured();
    if configured.is_empty() {
        return Err(anyhow::anyhow!(
            "no clip provider credentials found (RUNWAY_API_KEY, LUMA_API_KEY, REPLICATE_API_TOKEN)"
        ));
    }
    let names: Vec<&str> = configured.iter().map(|k| k.as_str()).collect();
    println!("adreel-selfcheck: providers {}", names.join(" > "));
    Ok(())
}

fn ensure_present(var: &str, present: bool) -> anyhow::Result<()> {
    if !present {
        return Err(anyhow::anyhow!("missing required env var {}", var));
    }
    Ok(())
}
