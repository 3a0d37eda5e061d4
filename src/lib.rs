//! # Placelet
//!
//! A Rust-native engine for browsing places on a map.
//!
//! Placelet keeps the moving parts of a places frontend in one coherent
//! state machine: dual login sessions (an app role plus a personal
//! account), switchable result sets (search, personal lists, group
//! views), case-insensitive text filtering, and marker synchronization
//! with clustering and viewport fitting. Rendering is delegated to a
//! pluggable marker backend, so the engine runs the same way against a
//! real map widget, a WASM bridge, or the bundled headless backend.

pub mod api;
pub mod core;
pub mod explorer;
pub mod markers;
pub mod prelude;
pub mod results;
pub mod runtime;
pub mod session;

// Re-export public API
pub use crate::core::{
    config::ExplorerConfig,
    geo::{LatLng, LatLngBounds},
    place::{ListKind, ListStatus, Place, PlaceId, PlaceKind},
};

pub use api::{client::HttpApi, PlacesApi};

pub use explorer::{events::ExplorerEvent, Explorer};

pub use markers::{backend::MarkerBackend, headless::HeadlessBackend};

pub use results::{ResultSet, ViewMode};

pub use session::SessionState;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Marker backend error: {0}")]
    Backend(String),

    #[error("Geolocation error: {0}")]
    Geolocation(String),
}

impl ExplorerError {
    /// Builds an API error from an HTTP status and a server-provided message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ExplorerError::Api {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExplorerError::Api { status, .. } => Some(*status),
            ExplorerError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// A message suitable for showing directly to the user.
    ///
    /// Auth failures map to fixed phrasings so the UI never surfaces raw
    /// server text for the two most common denials.
    pub fn user_message(&self) -> String {
        match self.status() {
            Some(401) => "Please log in to continue.".to_string(),
            Some(403) => "Your role does not allow this action.".to_string(),
            _ => match self {
                ExplorerError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Error type alias for convenience
pub type Error = ExplorerError;
