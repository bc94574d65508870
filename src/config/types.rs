use crate::{device::Device, polygon::DEFAULT_EPSILON_RATIO};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub polygon: PolygonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// The single origin allowed to call the API from a browser.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_encoder_path")]
    pub encoder_path: String,
    #[serde(default = "default_decoder_path")]
    pub decoder_path: String,
    /// Accelerators to try, most preferred first.
    #[serde(default = "default_devices")]
    pub devices: Vec<Device>,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
    /// Mask logits above this value count as foreground.
    #[serde(default)]
    pub mask_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonConfig {
    /// Simplification tolerance as a fraction of the contour perimeter.
    #[serde(default = "default_epsilon_ratio")]
    pub epsilon_ratio: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            max_upload_bytes: default_max_upload_bytes(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            encoder_path: default_encoder_path(),
            decoder_path: default_decoder_path(),
            devices: default_devices(),
            intra_threads: default_intra_threads(),
            mask_threshold: 0.0,
        }
    }
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            epsilon_ratio: default_epsilon_ratio(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_encoder_path() -> String {
    "models/sam_vit_b_01ec64.encoder.onnx".to_string()
}

fn default_decoder_path() -> String {
    "models/sam_vit_b_01ec64.decoder.onnx".to_string()
}

fn default_devices() -> Vec<Device> {
    Device::PREFERENCE.to_vec()
}

fn default_intra_threads() -> usize {
    4
}

fn default_epsilon_ratio() -> f64 {
    DEFAULT_EPSILON_RATIO
}
