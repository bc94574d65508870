use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid coordinates: {0}")]
    Coordinates(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::Request(format!("malformed multipart body: {}", err))
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True when the failure was caused by what the client sent rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Coordinates(_) | Self::ImageDecode(_) | Self::Request(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        let bad_json = serde_json::from_str::<[f32; 2]>("nope").unwrap_err();
        assert!(Error::from(bad_json).is_client_error());
        assert!(Error::request("missing field").is_client_error());
        assert!(!Error::model("decoder exploded").is_client_error());
        assert!(!Error::internal("join failed").is_client_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::config("bad port").to_string(),
            "Configuration error: bad port"
        );
        assert_eq!(
            Error::request("missing `coords` field").to_string(),
            "Invalid request: missing `coords` field"
        );
    }
}
