//! HTTP surface: the image endpoint, the render endpoints the browser loads,
//! and the interactive page.

pub mod endpoints;
pub mod router;
pub mod types;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl IntoResponse for types::ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

impl types::ErrorResponse {
    fn new(error: impl Into<String>, details: Option<String>, kind: &str) -> Self {
        Self {
            error: error.into(),
            details,
            kind: kind.to_string(),
        }
    }
}

impl From<crate::Error> for types::ErrorResponse {
    fn from(value: crate::Error) -> Self {
        error!("Route image generation failed ({}): {}", value.kind(), value);
        types::ErrorResponse::new(
            "Failed to generate route image",
            Some(value.to_string()),
            value.kind(),
        )
    }
}

/// Serve `router` on `listener` until the process stops
pub async fn serve(listener: tokio::net::TcpListener, router: axum::Router) -> std::io::Result<()> {
    axum::serve(listener, router).await
}
