use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use vexeei_engine::{config, server};

/// `RUST_LOG` wins over the configured level.
fn log_level(configured: &str, env_override: Option<String>) -> Result<String> {
    let level = env_override.unwrap_or_else(|| configured.to_string());
    if level.parse::<LevelFilter>().is_err() {
        bail!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        );
    }
    Ok(level)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

async fn start() -> Result<()> {
    let config = config::load()
        .await
        .context("Failed to load configuration")?;
    let level = log_level(&config.server.logs.level, std::env::var("RUST_LOG").ok())?;
    init_tracing(&level);

    info!(
        "Starting Vexeei AI Engine on {}:{} (log level {})",
        config.server.host, config.server.port, level
    );
    server::run(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = start().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
