use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use log::{debug, info};
use uuid::Uuid;

use crate::{scene, LatLng, RouteRequest};

use super::types::*;
use super::AppState;

pub type Result<T> = std::result::Result<T, ErrorResponse>;

const DEMO_ORIGIN: LatLng = LatLng { lat: -23.4875, lng: -46.6891 };
const DEMO_DESTINATION: LatLng = LatLng { lat: -23.4768, lng: -46.7088 };

pub async fn generate_route_image(
    State(state): State<AppState>,
    body: std::result::Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = ErrorResponse {
                error: "Invalid route request".into(),
                details: Some(rejection.body_text()),
                kind: "invalid_request".into(),
            };
            // Same status as every other failure; the kind tells them apart
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response());
        }
    };

    info!(
        "Rendering route ({}, {}) -> ({}, {})",
        request.origin.lat, request.origin.lng, request.destination.lat, request.destination.lng
    );

    let image = state.pipeline.render(&request).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    if let Some(distance) = image.distance {
        headers.insert("x-route-distance", HeaderValue::from(distance.round() as u64));
    }
    if let Some(duration) = image.duration {
        headers.insert("x-route-duration", HeaderValue::from(duration.round() as u64));
    }

    Ok((StatusCode::OK, headers, image.png).into_response())
}

/// Most recently composed scene, or an empty document
pub async fn render_latest(State(state): State<AppState>) -> Html<String> {
    let html = state.pipeline.scenes().latest();
    Html(html.map(|s| s.to_string()).unwrap_or_default())
}

pub async fn render_scene(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> std::result::Result<Html<String>, StatusCode> {
    let token = Uuid::parse_str(&token).map_err(|_| StatusCode::NOT_FOUND)?;
    match state.pipeline.scenes().get(&token) {
        Some(html) => {
            debug!("Serving scene {}", token);
            Ok(Html(html.to_string()))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

pub async fn interactive(State(state): State<AppState>, Query(q): Query<InteractiveQuery>) -> Html<String> {
    let request = RouteRequest {
        origin: LatLng {
            lat: q.origem_lat.unwrap_or(DEMO_ORIGIN.lat),
            lng: q.origem_lng.unwrap_or(DEMO_ORIGIN.lng),
        },
        destination: LatLng {
            lat: q.destino_lat.unwrap_or(DEMO_DESTINATION.lat),
            lng: q.destino_lng.unwrap_or(DEMO_DESTINATION.lng),
        },
    };
    Html(scene::compose_interactive(&request, state.pipeline.scene_options()))
}

pub async fn healthz() -> &'static str {
    "ok"
}
