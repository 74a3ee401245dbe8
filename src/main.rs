//! AWARE — pump.fun token scanner with AI quality assessment
//!
//! Entry point. Loads `.env` and configuration, resolves secrets once,
//! initialises structured logging, wires the components and serves the
//! HTTP API until Ctrl+C.

use anyhow::Result;
use tracing::info;

use aware::app;
use aware::config::{AppConfig, Secrets};
use aware::server;

/// Config path used when `AWARE_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("AWARE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = AppConfig::load_or_default(&config_path)?;
    cfg.apply_env_overrides();

    let secrets = Secrets::from_env(&cfg);

    info!(
        config = %config_path,
        port = cfg.server.port,
        feed = %cfg.feed.base_url,
        candidate_limit = cfg.feed.candidate_limit,
        enrichment_limit = cfg.scan.enrichment_limit,
        strategy = ?cfg.enricher.strategy,
        "AWARE starting up"
    );

    let state = app::build_state(&cfg, &secrets)?;
    server::serve(state, cfg.server.port, &cfg.server.static_dir).await?;

    info!("AWARE shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aware=info,tower_http=info"));

    let json_logging = std::env::var("AWARE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
