//! Route → scene → snapshot orchestration

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use url::Url;

use crate::directions::DirectionsClient;
use crate::scene::{self, SceneOptions};
use crate::store::SceneStore;
use crate::{async_api, Error, Result, RouteRequest, Snapshotter};

/// Path prefix the browser loads stashed scenes from
pub const RENDER_PATH: &str = "/render-map";

/// A rendered route
#[derive(Debug)]
pub struct RouteImage {
    pub png: Vec<u8>,
    /// Route length in meters, when the directions API reported it
    pub distance: Option<f64>,
    /// Travel time in seconds, when the directions API reported it
    pub duration: Option<f64>,
}

pub struct Pipeline {
    directions: DirectionsClient,
    scene: SceneOptions,
    scenes: Arc<SceneStore>,
    snapshotter: Arc<dyn Snapshotter>,
    render_base: Url,
    archive_dir: Option<PathBuf>,
}

impl Pipeline {
    /// `render_base` is the address the browser uses to reach this service,
    /// e.g. `http://127.0.0.1:3004`.
    pub fn new(
        directions: DirectionsClient,
        scene: SceneOptions,
        snapshotter: Arc<dyn Snapshotter>,
        render_base: Url,
    ) -> Self {
        Self {
            directions,
            scene,
            scenes: SceneStore::new(),
            snapshotter,
            render_base,
            archive_dir: None,
        }
    }

    /// Also write every image to `<dir>/rota-<token>.png`
    pub fn with_archive_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.archive_dir = dir;
        self
    }

    pub fn scenes(&self) -> &Arc<SceneStore> {
        &self.scenes
    }

    pub fn scene_options(&self) -> &SceneOptions {
        &self.scene
    }

    /// Fetch, compose, load and capture the route for `request`.
    ///
    /// The browser is only involved once the route is known; directions
    /// failures return before anything is launched.
    pub async fn render(&self, request: &RouteRequest) -> Result<RouteImage> {
        if !self.directions.has_access_token() {
            return Err(Error::ConfigError("directions API access token is not configured".into()));
        }

        let route = self.directions.fetch_route(request).await?;

        let html = scene::compose(request, &route.geometry, &self.scene);
        let ticket = self.scenes.stash(html);

        let url = self.scene_url(&ticket.id().to_string())?;
        let png = async_api::capture(Arc::clone(&self.snapshotter), url.to_string()).await?;

        if let Some(dir) = &self.archive_dir {
            let path = dir.join(format!("rota-{}.png", ticket.id()));
            match tokio::fs::write(&path, &png).await {
                Ok(()) => info!("Route image archived at {}", path.display()),
                Err(e) => warn!("Failed to archive route image at {}: {}", path.display(), e),
            }
        }

        Ok(RouteImage {
            png,
            distance: route.distance,
            duration: route.duration,
        })
    }

    fn scene_url(&self, token: &str) -> Result<Url> {
        self.render_base
            .join(&format!("{}/{}", RENDER_PATH, token))
            .map_err(|e| Error::ConfigError(format!("error joining render url: {}", e)))
    }
}
