//! API access layer
//!
//! The engine talks to the places backend exclusively through the
//! [`PlacesApi`] trait so tests and alternative transports can swap in
//! their own implementation. [`client::HttpApi`] is the production
//! implementation over a shared reqwest client.

pub mod cache;
pub mod client;
pub mod shapes;

use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::place::{ListKind, PlaceId, PlaceKind};
use crate::Result;
use async_trait::async_trait;

// Re-exports for convenience
pub use shapes::{ExportPayload, ImportSummary, PlaceDraft, PlacePage};

/// One of the three spatial query modes the backend supports
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// All places within `km` kilometers of `center`
    Radius { center: LatLng, km: f64 },
    /// The `k` places closest to `center`, with distances
    Nearest { center: LatLng, k: u32 },
    /// All places inside the box
    BoundingBox { bounds: LatLngBounds },
}

impl SearchQuery {
    /// Client-side validation, mirroring the ranges the server enforces.
    ///
    /// Violations never leave the process; they surface as local errors
    /// before any request is issued.
    pub fn validate(&self) -> Result<()> {
        match self {
            SearchQuery::Radius { center, km } => {
                validate_position(center)?;
                if !(0.1..=1000.0).contains(km) {
                    return Err(crate::Error::Validation(
                        "km must be between 0.1 and 1000".to_string(),
                    ));
                }
            }
            SearchQuery::Nearest { center, k } => {
                validate_position(center)?;
                if !(1..=100).contains(k) {
                    return Err(crate::Error::Validation(
                        "k must be between 1 and 100".to_string(),
                    ));
                }
            }
            SearchQuery::BoundingBox { bounds } => {
                validate_position(&bounds.south_west)?;
                validate_position(&bounds.north_east)?;
                if bounds.south_west.lat > bounds.north_east.lat
                    || bounds.south_west.lng > bounds.north_east.lng
                {
                    return Err(crate::Error::Validation(
                        "bounding box corners are inverted".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_position(position: &LatLng) -> Result<()> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(crate::Error::InvalidCoordinates(format!(
            "lat {}, lon {}",
            position.lat, position.lng
        )))
    }
}

/// Optional server-side filters shared by the search endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    /// Case-insensitive state filter
    pub state: Option<String>,
    /// Case-insensitive name substring filter
    pub name: Option<String>,
    /// Restrict to these place kinds; empty means all
    pub kinds: Vec<PlaceKind>,
}

impl SearchParams {
    /// Query-string pairs for the filters that are set
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(state) = &self.state {
            pairs.push(("state", state.clone()));
        }
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if !self.kinds.is_empty() {
            let joined = self
                .kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("place_type", joined));
        }
        pairs
    }
}

/// Export formats offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    GeoJson,
}

impl ExportFormat {
    pub fn path(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "/export/csv",
            ExportFormat::GeoJson => "/export/geojson",
        }
    }
}

/// Everything the engine needs from the places backend.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to
/// call from spawned tasks.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    // Liveness
    async fn health(&self) -> Result<shapes::HealthStatus>;

    // Role auth
    async fn check_role_auth(&self) -> Result<shapes::AuthCheck>;
    async fn login_role(&self, username: &str, password: &str) -> Result<shapes::RoleLogin>;
    async fn logout_role(&self) -> Result<()>;
    async fn permissions(&self) -> Result<shapes::PermissionReport>;

    // Search
    async fn search(&self, query: &SearchQuery, params: &SearchParams) -> Result<PlacePage>;

    // Stats and analytics
    async fn stats(&self) -> Result<shapes::Stats>;
    async fn state_analytics(&self) -> Result<shapes::StateAnalytics>;
    async fn density(&self, center: LatLng, radius_km: Option<f64>)
        -> Result<shapes::DensityReport>;

    // Export
    async fn export(&self, format: ExportFormat, params: &SearchParams) -> Result<ExportPayload>;

    // Place mutation
    async fn add_place(&self, draft: &PlaceDraft) -> Result<shapes::AddPlaceResponse>;
    async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> Result<ImportSummary>;

    // Accounts
    async fn register_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<shapes::AccountRegistered>;
    async fn login_account(&self, username: &str, password: &str)
        -> Result<shapes::AccountLogin>;
    async fn profile(&self) -> Result<shapes::AccountProfile>;

    // Personal lists
    async fn personal_list(&self, kind: ListKind, reference: Option<LatLng>)
        -> Result<PlacePage>;
    async fn add_to_list(&self, kind: ListKind, place_id: PlaceId, notes: Option<&str>)
        -> Result<()>;
    async fn remove_from_list(&self, kind: ListKind, place_id: PlaceId) -> Result<()>;
    async fn place_status(&self, place_id: PlaceId) -> Result<shapes::PlaceStatus>;

    // Groups
    async fn create_group(&self, name: &str, description: &str) -> Result<shapes::GroupSummary>;
    async fn my_groups(&self) -> Result<Vec<shapes::GroupSummary>>;
    async fn group_details(&self, group_id: i64) -> Result<shapes::GroupDetails>;
    async fn add_group_member(&self, group_id: i64, username: &str) -> Result<()>;
    async fn remove_group_member(&self, group_id: i64, member_id: i64) -> Result<()>;
    async fn group_places(&self, group_id: i64) -> Result<PlacePage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_validation() {
        let center = LatLng::new(40.0, -74.0);
        assert!(SearchQuery::Radius { center, km: 50.0 }.validate().is_ok());
        assert!(SearchQuery::Radius { center, km: 0.01 }.validate().is_err());
        assert!(SearchQuery::Radius { center, km: 1500.0 }
            .validate()
            .is_err());

        let bad_center = LatLng::new(95.0, -74.0);
        assert!(SearchQuery::Radius {
            center: bad_center,
            km: 50.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_nearest_validation() {
        let center = LatLng::new(40.0, -74.0);
        assert!(SearchQuery::Nearest { center, k: 1 }.validate().is_ok());
        assert!(SearchQuery::Nearest { center, k: 100 }.validate().is_ok());
        assert!(SearchQuery::Nearest { center, k: 0 }.validate().is_err());
        assert!(SearchQuery::Nearest { center, k: 101 }.validate().is_err());
    }

    #[test]
    fn test_bbox_validation() {
        let bounds = LatLngBounds::from_coords(40.0, -75.0, 41.0, -73.0);
        assert!(SearchQuery::BoundingBox { bounds }.validate().is_ok());

        let inverted = LatLngBounds::from_coords(41.0, -73.0, 40.0, -75.0);
        assert!(SearchQuery::BoundingBox { bounds: inverted }
            .validate()
            .is_err());
    }

    #[test]
    fn test_search_params_query_pairs() {
        let params = SearchParams {
            state: Some("VT".to_string()),
            name: None,
            kinds: vec![PlaceKind::Brewery, PlaceKind::Hotel],
        };
        let pairs = params.query_pairs();
        assert!(pairs.contains(&("state", "VT".to_string())));
        assert!(pairs.contains(&("place_type", "brewery,hotel".to_string())));
        assert_eq!(pairs.len(), 2);

        assert!(SearchParams::default().query_pairs().is_empty());
    }
}
