//! Command-line and environment configuration

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::info;

use crate::directions::{DirectionsConfig, DEFAULT_DIRECTIONS_URL, DEFAULT_PROFILE};
use crate::scene::{SceneOptions, DEFAULT_OSRM_URL, DEFAULT_TILE_URL};
use crate::{Error, Result, SnapshotConfig, Viewport, WaitStrategy};

pub const DEFAULT_PORT: u16 = 3004;

/// Render driving routes to PNG through headless Chrome
#[derive(Debug, Parser)]
#[command(name = "routeshot", version, about)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "ROUTESHOT_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "ROUTESHOT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directions API access token (also used for map tiles)
    #[arg(long, env = "MAPBOX_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Base URL of the directions API
    #[arg(long, env = "ROUTESHOT_DIRECTIONS_URL", default_value = DEFAULT_DIRECTIONS_URL)]
    pub directions_url: String,

    /// Routing profile
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Tile URL template; `{accessToken}` is replaced by Leaflet
    #[arg(long, env = "ROUTESHOT_TILE_URL", default_value = DEFAULT_TILE_URL)]
    pub tile_url: String,

    /// Serve Leaflet from this directory under /leaflet instead of the CDN
    #[arg(long, env = "ROUTESHOT_LEAFLET_DIR")]
    pub leaflet_dir: Option<PathBuf>,

    /// Timeout for directions API requests in milliseconds
    #[arg(long)]
    pub upstream_timeout_ms: Option<u64>,

    /// How long to wait for the map to signal it finished drawing
    #[arg(long, default_value_t = 10_000)]
    pub ready_timeout_ms: u64,

    /// Sleep this long after navigation instead of waiting for the ready signal
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Keep Chrome's sandbox enabled
    #[arg(long)]
    pub sandbox: bool,

    /// Chrome binary to launch
    #[arg(long, env = "CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Do not relay browser console output to the log
    #[arg(long)]
    pub no_console_forwarding: bool,

    /// Draw the origin/destination legend on captured images
    #[arg(long)]
    pub legend: bool,

    /// Also save every image into this directory
    #[arg(long, env = "ROUTESHOT_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// OSRM service used by the interactive page
    #[arg(long, default_value = DEFAULT_OSRM_URL)]
    pub osrm_url: String,
}

/// Effective service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub directions: DirectionsConfig,
    pub scene: SceneOptions,
    pub snapshot: SnapshotConfig,
    pub leaflet_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        if let Some(dir) = &args.leaflet_dir {
            if !dir.is_dir() {
                return Err(Error::ConfigError(format!("leaflet dir {} does not exist", dir.display())));
            }
        }

        let map_size = Viewport::default();

        let directions = DirectionsConfig {
            base_url: args.directions_url,
            profile: args.profile,
            access_token: args.access_token.clone(),
            timeout: args.upstream_timeout_ms.map(Duration::from_millis),
        };

        let mut scene = SceneOptions {
            tile_url: args.tile_url,
            access_token: args.access_token,
            osrm_url: args.osrm_url,
            map_size,
            legend: args.legend,
            ..Default::default()
        };
        if args.leaflet_dir.is_some() {
            scene.leaflet_base = "/leaflet".to_string();
        }

        let wait = match args.settle_ms {
            Some(ms) => WaitStrategy::FixedDelay { ms },
            None => WaitStrategy::ReadySignal {
                timeout_ms: args.ready_timeout_ms,
            },
        };

        let snapshot = SnapshotConfig {
            viewport: map_size,
            wait,
            sandbox: args.sandbox,
            chrome_path: args.chrome_path,
            forward_console: !args.no_console_forwarding,
            ..Default::default()
        };

        Ok(Self {
            listen: SocketAddr::new(args.host, args.port),
            directions,
            scene,
            snapshot,
            leaflet_dir: args.leaflet_dir,
            archive_dir: args.archive_dir,
        })
    }

    /// Log the effective configuration; the access token is never printed
    pub fn log(&self) {
        info!("Listen address: {}", self.listen);
        info!(
            "Directions API: {} (profile {}, token {})",
            self.directions.base_url,
            self.directions.profile,
            if self.directions.access_token.is_some() { "set" } else { "NOT SET" }
        );
        info!("Leaflet assets: {}", self.scene.leaflet_base);
        info!("Wait strategy: {:?}", self.snapshot.wait);
        if let Some(dir) = &self.archive_dir {
            info!("Archiving images to {}", dir.display());
        }
    }
}
