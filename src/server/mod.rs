pub mod handlers;
pub mod types;

use crate::{Error, Result, config::Config, config::ServerConfig, predictor::Predictor};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Builds the application router around an already loaded predictor.
pub fn router(predictor: Arc<Predictor>, config: &ServerConfig) -> Result<Router> {
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        Error::config(format!("Invalid cors_origin '{}': {}", config.cors_origin, e))
    })?;

    let app_state = AppState { predictor };

    Ok(Router::new()
        .route("/", get(handlers::status))
        .route("/segment", post(handlers::segment))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}

pub async fn run(config: Config) -> Result<()> {
    // Load the model once; every request shares it.
    let predictor = Predictor::load(&config)?;

    let app = router(Arc::new(predictor), &config.server)?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
