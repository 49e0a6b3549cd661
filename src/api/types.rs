use serde::{Deserialize, Serialize};

/// Body of every failed image request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Failure class, see `Error::kind`
    pub kind: String,
}

/// Query of the interactive page; missing values fall back to the demo route
#[derive(Debug, Default, Deserialize)]
pub struct InteractiveQuery {
    pub origem_lat: Option<f64>,
    pub origem_lng: Option<f64>,
    pub destino_lat: Option<f64>,
    pub destino_lng: Option<f64>,
}
