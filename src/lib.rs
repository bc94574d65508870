pub mod config;
pub mod device;
pub mod error;
pub mod polygon;
pub mod predictor;
pub mod segmentation;
pub mod server;

pub use error::{Error, Result};
