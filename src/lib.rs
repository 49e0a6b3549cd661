//! routeshot
//!
//! A small HTTP service that turns an origin/destination pair into a PNG of
//! the driving route drawn on a Leaflet map.
//!
//! # Pipeline
//!
//! - **Directions**: fetch the route geometry from a Mapbox-compatible
//!   directions API ([`directions`])
//! - **Scene**: compose a self-contained Leaflet page around it ([`scene`])
//! - **Store**: park the page under a per-request token so a browser can
//!   navigate to it ([`store`])
//! - **Snapshot**: drive headless Chrome to the page and capture the map
//!   element ([`snapshot`], [`cdp`])
//!
//! # Example
//!
//! ```
//! use routeshot::{scene, LatLng, RouteRequest};
//!
//! let request = RouteRequest {
//!     origin: LatLng { lat: -23.4875, lng: -46.6891 },
//!     destination: LatLng { lat: -23.4768, lng: -46.7088 },
//! };
//! let geometry = serde_json::value::RawValue::from_string(
//!     r#"{"type":"LineString","coordinates":[[-46.6891,-23.4875],[-46.7088,-23.4768]]}"#.to_string(),
//! )
//! .unwrap();
//!
//! let html = scene::compose(&request, &geometry, &scene::SceneOptions::default());
//! assert!(html.contains("L.marker([-23.4875, -46.6891]"));
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod api;
pub mod async_api;
pub mod config;
pub mod directions;
pub mod pipeline;
pub mod scene;
pub mod snapshot;
pub mod store;

// Chrome DevTools Protocol snapshot backend
#[cfg(feature = "cdp")]
pub mod cdp;

pub use pipeline::{Pipeline, RouteImage};
pub use snapshot::{SnapshotConfig, Snapshotter, WaitStrategy};

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Origin and destination of a route to render
///
/// Deserializes from either the flat form used by the image endpoint
/// (`origem_latitude`, `origem_longitude`, `destino_latitude`,
/// `destino_longitude`) or the nested form used by the interactive page
/// (`{"origem": {"lat", "lng"}, "destino": {"lat", "lng"}}`).
///
/// ```
/// let flat: routeshot::RouteRequest = serde_json::from_str(
///     r#"{"origem_latitude":1.0,"origem_longitude":2.0,"destino_latitude":3.0,"destino_longitude":4.0}"#,
/// ).unwrap();
/// let nested: routeshot::RouteRequest = serde_json::from_str(
///     r#"{"origem":{"lat":1.0,"lng":2.0},"destino":{"lat":3.0,"lng":4.0}}"#,
/// ).unwrap();
/// assert_eq!(flat, nested);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RouteRequestWire")]
pub struct RouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RouteRequestWire {
    Flat {
        origem_latitude: f64,
        origem_longitude: f64,
        destino_latitude: f64,
        destino_longitude: f64,
    },
    Nested {
        origem: LatLng,
        destino: LatLng,
    },
}

impl From<RouteRequestWire> for RouteRequest {
    fn from(wire: RouteRequestWire) -> Self {
        match wire {
            RouteRequestWire::Flat {
                origem_latitude,
                origem_longitude,
                destino_latitude,
                destino_longitude,
            } => Self {
                origin: LatLng { lat: origem_latitude, lng: origem_longitude },
                destination: LatLng { lat: destino_latitude, lng: destino_longitude },
            },
            RouteRequestWire::Nested { origem, destino } => Self {
                origin: origem,
                destination: destino,
            },
        }
    }
}

/// Pixel dimensions of the map container (and of the browser window that
/// renders it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}
