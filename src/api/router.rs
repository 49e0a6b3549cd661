use std::path::Path;

use axum::routing::{get, post};
use tower_http::services::ServeDir;

use crate::pipeline::RENDER_PATH;

use super::endpoints;
use super::AppState;

pub fn router(state: AppState, leaflet_dir: Option<&Path>) -> axum::Router {
    let router = axum::Router::new()
        .route("/api/gerar-imagem-rota", post(endpoints::generate_route_image))
        .route(RENDER_PATH, get(endpoints::render_latest))
        .route(&format!("{RENDER_PATH}/:token"), get(endpoints::render_scene))
        .route("/mapa", get(endpoints::interactive))
        .route("/healthz", get(endpoints::healthz));

    let router = match leaflet_dir {
        Some(dir) => router.nest_service("/leaflet", ServeDir::new(dir)),
        None => router,
    };

    router.with_state(state)
}
