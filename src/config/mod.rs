mod types;

pub use types::*;

use crate::{Error, Result};
use std::env;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    match env::var("CONFIG_PATH") {
        Ok(path) => load_from(&path).await,
        Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(
                "No {} found, using built-in defaults",
                DEFAULT_CONFIG_PATH
            );
            Ok(Config::default())
        }
        Err(_) => load_from(DEFAULT_CONFIG_PATH).await,
    }
}

pub async fn load_from(config_path: &str) -> Result<Config> {
    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let ratio = config.polygon.epsilon_ratio;
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(Error::config(format!(
            "polygon.epsilon_ratio must be a non-negative number, got {}",
            ratio
        )));
    }
    if config.model.intra_threads == 0 {
        return Err(Error::config("model.intra_threads must be at least 1"));
    }
    Ok(())
}
