pub mod config;
pub mod geo;
pub mod place;

// Re-exports for convenience
pub use config::ExplorerConfig;
pub use geo::{LatLng, LatLngBounds};
pub use place::{ListStatus, Place, PlaceId, PlaceKind};
