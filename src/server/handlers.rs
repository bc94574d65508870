use super::types::{ErrorResponse, SegmentResponse, StatusResponse};
use crate::{Error, Result, polygon::Polygon, predictor::Predictor, segmentation::Point};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SYSTEM_NAME: &str = "Vexeei AI Engine";

/// Multipart field carrying the image bytes.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the `[x, y]` click as a JSON string.
pub const COORDS_FIELD: &str = "coords";

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
        system: SYSTEM_NAME.to_string(),
        device: state.predictor.device().to_string(),
    })
}

pub async fn segment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> std::result::Result<Json<SegmentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = Uuid::new_v4();

    match process(&state, multipart, request_id).await {
        Ok(polygon) => {
            info!(
                "Request {} produced a polygon with {} vertices",
                request_id,
                polygon.len()
            );
            Ok(Json(SegmentResponse {
                success: true,
                polygon,
            }))
        }
        Err(e) => {
            let status = if e.is_client_error() {
                warn!("Rejected request {}: {}", request_id, e);
                StatusCode::BAD_REQUEST
            } else {
                error!("Failed to segment request {}: {}", request_id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err((
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn process(state: &AppState, multipart: Multipart, request_id: Uuid) -> Result<Polygon> {
    let upload = read_upload(multipart).await?;
    info!(
        "Received request {} for coords: {} ({} bytes)",
        request_id,
        upload.coords,
        upload.file.len()
    );

    let point = Point::parse(&upload.coords)?;

    // Inference is CPU/GPU bound; keep it off the async workers.
    let predictor = Arc::clone(&state.predictor);
    tokio::task::spawn_blocking(move || predictor.predict_bytes(&upload.file, point))
        .await
        .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))?
}

struct Upload {
    file: Bytes,
    coords: String,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut file = None;
    let mut coords = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => file = Some(field.bytes().await?),
            Some(COORDS_FIELD) => coords = Some(field.text().await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| Error::request(format!("missing `{}` field", FILE_FIELD)))?;
    let coords =
        coords.ok_or_else(|| Error::request(format!("missing `{}` field", COORDS_FIELD)))?;

    Ok(Upload { file, coords })
}
