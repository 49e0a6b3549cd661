//! Client for a Mapbox-compatible directions API.
//!
//! One GET per route, geometry requested as GeoJSON. The route geometry is
//! kept as raw JSON text so it reaches the composed scene exactly as the
//! upstream sent it.

use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use serde_json::value::RawValue;
use url::Url;

use crate::{Error, Result, RouteRequest};

pub const DEFAULT_DIRECTIONS_URL: &str = "https://api.mapbox.com/directions/v5/mapbox";
pub const DEFAULT_PROFILE: &str = "driving";

/// Status code the directions API uses for a successful lookup
const OK_CODE: &str = "Ok";

/// Connection settings for the directions API
#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    /// Base URL; the profile and coordinates are appended as path segments
    pub base_url: String,
    /// Routing profile, e.g. `driving`
    pub profile: String,
    /// API access token, sent as the `access_token` query parameter
    pub access_token: Option<String>,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_URL.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            access_token: None,
            timeout: None,
        }
    }
}

/// A route returned by the directions API
#[derive(Debug)]
pub struct Route {
    /// GeoJSON geometry, verbatim
    pub geometry: Box<RawValue>,
    /// Length in meters
    pub distance: Option<f64>,
    /// Travel time in seconds
    pub duration: Option<f64>,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    geometry: Box<RawValue>,
    distance: Option<f64>,
    duration: Option<f64>,
}

#[derive(Clone)]
pub struct DirectionsClient {
    inner: reqwest::Client,
    base: Url,
    profile: String,
    access_token: Option<String>,
}

impl DirectionsClient {
    pub fn new(config: DirectionsConfig) -> Result<Self> {
        let base: Url = config
            .base_url
            .parse()
            .map_err(|e| Error::ConfigError(format!("{} is not a valid url: {}", config.base_url, e)))?;

        if base.cannot_be_a_base() {
            return Err(Error::ConfigError(format!("{} cannot be used as a base url", config.base_url)));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner,
            base,
            profile: config.profile,
            access_token: config.access_token.filter(|t| !t.is_empty()),
        })
    }

    /// Whether an access token is configured
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Build the lookup URL for `request`.
    ///
    /// Coordinates go in `lon,lat` order, origin first.
    pub fn route_url(&self, request: &RouteRequest) -> Result<Url> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| Error::ConfigError("directions API access token is not configured".into()))?;

        let coords = format!(
            "{},{};{},{}",
            request.origin.lng, request.origin.lat, request.destination.lng, request.destination.lat
        );

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigError(format!("{} cannot be used as a base url", self.base)))?
            .pop_if_empty()
            .push(&self.profile)
            .push(&coords);
        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("access_token", token);

        Ok(url)
    }

    /// Fetch the first route between origin and destination
    pub async fn fetch_route(&self, request: &RouteRequest) -> Result<Route> {
        let url = self.route_url(request)?;
        debug!("Requesting route {}{}", url.origin().ascii_serialization(), url.path());

        let response = self.inner.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let route = parse_response(status, &body)?;
        info!(
            "Route found: {} m, {} s",
            route.distance.map_or_else(|| "?".to_string(), |d| format!("{:.0}", d)),
            route.duration.map_or_else(|| "?".to_string(), |d| format!("{:.0}", d)),
        );
        Ok(route)
    }
}

fn parse_response(status: reqwest::StatusCode, body: &str) -> Result<Route> {
    let parsed: DirectionsResponse = serde_json::from_str(body).map_err(|e| {
        Error::NetworkError(format!("directions API returned a non-JSON body (HTTP {}): {}", status.as_u16(), e))
    })?;

    let code = match parsed.code {
        Some(code) => code,
        None if !status.is_success() => status.as_u16().to_string(),
        None => {
            return Err(Error::UpstreamRoute {
                code: "missing".into(),
                message: parsed.message.or_else(|| Some("response carried no status code".into())),
            })
        }
    };

    if code != OK_CODE {
        return Err(Error::UpstreamRoute {
            code,
            message: parsed.message,
        });
    }

    let first = parsed.routes.into_iter().next().ok_or_else(|| Error::UpstreamRoute {
        code: OK_CODE.into(),
        message: Some("response contained no routes".into()),
    })?;

    Ok(Route {
        geometry: first.geometry,
        distance: first.distance,
        duration: first.duration,
    })
}
