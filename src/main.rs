use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use market_pipeline::feeds::FetchRequest;
use market_pipeline::{Config, Pipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Load config (defaults when the file is absent)
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let from_file = path.exists();
    let config = if from_file { Config::load(&path)? } else { Config::default() };

    // 2. Logger: RUST_LOG wins over app.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.app.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    if from_file {
        tracing::info!("📋 Loaded config from {}", path.display());
    } else {
        tracing::warn!("⚠️ No config at {}, using defaults", path.display());
    }

    if config.sources.is_empty() {
        tracing::warn!("No sources configured, nothing to do");
        return Ok(());
    }

    // 3. Build pipeline and run every source once
    let pipeline = Pipeline::from_config(&config)?;
    let requests: Vec<FetchRequest> = config.sources.iter().map(|s| FetchRequest::new(&s.id)).collect();

    tracing::info!("⏳ Running {} sources...", requests.len());

    let mut failures = 0usize;
    for (request, result) in requests.iter().zip(pipeline.run_each(&requests).await) {
        match result {
            Ok(plan) => {
                let mut out = serde_json::to_value(&plan)?;
                out["source"] = serde_json::Value::String(request.source_id.clone());
                println!("{}", serde_json::to_string(&out)?);
            }
            Err(e) => {
                failures += 1;
                tracing::error!(source = %request.source_id, "Pipeline failed: {}", e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} sources failed", failures, requests.len());
    }
    Ok(())
}
