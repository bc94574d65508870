use crate::polygon::Polygon;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub system: String,
    pub device: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub success: bool,
    pub polygon: Polygon,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
