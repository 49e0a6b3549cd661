//! Error types for the route snapshot pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a route image
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration is missing or invalid
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The directions API answered, but not with a usable route
    #[error("Directions API returned an error: {}", describe_upstream(.code, .message.as_deref()))]
    UpstreamRoute {
        code: String,
        message: Option<String>,
    },

    /// Transport failure or unreadable response from the directions API
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The browser process could not be started
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Navigation to the render endpoint failed
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The map container never showed up in the page
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page did not signal readiness in time
    #[error("Map did not finish rendering after {0}ms")]
    RenderTimeout(u64),

    /// Screenshot capture failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn describe_upstream(code: &str, message: Option<&str>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!("{code} ({message})"),
        _ => code.to_string(),
    }
}

impl Error {
    /// Stable, machine-readable tag for the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigError(_) => "config",
            Error::UpstreamRoute { .. } => "upstream_route",
            Error::NetworkError(_) => "network",
            Error::BrowserLaunch(_) => "browser_launch",
            Error::LoadError(_) => "navigation",
            Error::ElementNotFound(_) => "element_not_found",
            Error::RenderTimeout(_) => "render_timeout",
            Error::RenderError(_) => "render",
            Error::Io(_) => "io",
            Error::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // reqwest includes the full URL in its Display, which carries the token
        Error::NetworkError(err.without_url().to_string())
    }
}
