//! Wire shapes for the places backend
//!
//! The backend grew organically and its collection payloads come in
//! three spellings (`{"features": [...]}`, `{"places": [...]}`, or a
//! bare array), with coordinates under `lat`/`lon` or
//! `latitude`/`longitude`, as numbers or numeric strings. Everything
//! here decodes all observed spellings into the one domain model in
//! [`crate::core::place`]. A record with unusable coordinates decodes
//! with `position: None` instead of failing the payload.

use crate::core::geo::LatLng;
use crate::core::place::{ListStatus, Place, PlaceKind};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accepts a JSON number, a numeric string, null, or a missing field.
/// Anything unparseable becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// One place record as the server sends it, before normalization
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlace {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub list_status: Option<ListStatus>,
    #[serde(default)]
    pub visited: Option<bool>,
    #[serde(default)]
    pub in_wishlist: Option<bool>,
    #[serde(default)]
    pub liked: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawPlace {
    /// Normalizes the record into the domain model.
    ///
    /// Coordinate aliases are merged (`lat`/`lon` win over
    /// `latitude`/`longitude`), out-of-range or non-finite positions
    /// become `None`, unknown place kinds become `None`, and membership
    /// flags are taken nested first, flat second.
    pub fn into_place(self) -> Place {
        let lat = self.lat.or(self.latitude);
        let lng = self.lon.or(self.longitude);
        let position = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)).filter(LatLng::is_valid),
            _ => None,
        };

        let kind = self
            .place_type
            .as_deref()
            .and_then(|s| s.parse::<PlaceKind>().ok());

        let has_flat_flags =
            self.visited.is_some() || self.in_wishlist.is_some() || self.liked.is_some();
        let list_status = match (self.list_status, has_flat_flags) {
            (Some(nested), _) => Some(nested),
            (None, true) => Some(ListStatus {
                visited: self.visited.unwrap_or(false),
                in_wishlist: self.in_wishlist.unwrap_or(false),
                liked: self.liked.unwrap_or(false),
            }),
            (None, false) => None,
        };

        Place {
            id: self.id,
            name: self.name,
            city: self.city,
            state: self.state,
            country: self.country,
            kind,
            position,
            distance_km: self.distance_km,
            list_status,
            extra: self.extra,
        }
    }
}

/// A reference coordinate as the server spells it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub lat: f64,
    pub lon: f64,
}

impl From<RawLocation> for LatLng {
    fn from(raw: RawLocation) -> Self {
        LatLng::new(raw.lat, raw.lon)
    }
}

/// Every collection payload spelling the backend is known to emit.
///
/// Variant order matters: `serde` tries them top to bottom.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PlacesPayload {
    Features {
        features: Vec<RawPlace>,
        #[serde(default)]
        count: Option<usize>,
    },
    Places {
        places: Vec<RawPlace>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        reference_location: Option<RawLocation>,
    },
    Bare(Vec<RawPlace>),
}

impl PlacesPayload {
    /// Flattens any spelling into one normalized page
    pub fn into_page(self) -> PlacePage {
        let (raw, count, reference_location) = match self {
            PlacesPayload::Features { features, count } => (features, count, None),
            PlacesPayload::Places {
                places,
                count,
                reference_location,
            } => (places, count, reference_location),
            PlacesPayload::Bare(raw) => (raw, None, None),
        };

        let places: Vec<Place> = raw.into_iter().map(RawPlace::into_place).collect();
        let count = count.unwrap_or(places.len());
        PlacePage {
            count,
            reference_location: reference_location.map(LatLng::from),
            places,
        }
    }
}

/// One normalized page of places
#[derive(Debug, Clone, PartialEq)]
pub struct PlacePage {
    pub places: Vec<Place>,
    /// Server-reported count, or the page length when absent
    pub count: usize,
    /// Set when distances were computed relative to a location
    pub reference_location: Option<LatLng>,
}

/// `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// `GET /auth/check`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheck {
    pub authenticated: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub available_roles: Option<Vec<String>>,
}

impl AuthCheck {
    /// The backend spells the role as `role` or `user_role` depending on
    /// the code path that produced the response.
    pub fn effective_role(&self) -> Option<&str> {
        self.role.as_deref().or(self.user_role.as_deref())
    }
}

/// `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct RoleLogin {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl RoleLogin {
    pub fn effective_role(&self) -> Option<&str> {
        self.role.as_deref().or(self.user_role.as_deref())
    }
}

/// Database-level capabilities reported for the current role
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionFlags {
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub can_select: bool,
    #[serde(default)]
    pub can_insert: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_execute_functions: bool,
}

/// `GET /security/permissions`
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionReport {
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub session_user: Option<String>,
    #[serde(default)]
    pub permissions: Option<PermissionFlags>,
    /// Role descriptions, passed through for display
    #[serde(default)]
    pub role_info: Option<Value>,
}

/// One `{state, count}` row from the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCount {
    pub state: Option<String>,
    pub count: u64,
}

/// Dataset extent reported by `GET /stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// `GET /stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_places: u64,
    #[serde(default)]
    pub top_states: Vec<StateCount>,
    #[serde(default)]
    pub bounds: Option<StatsBounds>,
}

/// One per-state aggregation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBreakdown {
    pub state: Option<String>,
    pub count: u64,
    #[serde(default)]
    pub avg_lat: Option<f64>,
    #[serde(default)]
    pub avg_lon: Option<f64>,
}

/// `GET /analytics/states`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAnalytics {
    #[serde(default)]
    pub states: Vec<StateBreakdown>,
    pub total: u64,
}

/// `GET /analytics/density`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityReport {
    pub center: RawLocation,
    pub radius_km: f64,
    pub count: u64,
    pub density_per_1000_km2: f64,
}

/// Raw export body plus its content type
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Request body for `POST /places/add`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub place_type: PlaceKind,
}

impl PlaceDraft {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, place_type: PlaceKind) -> Self {
        Self {
            name: name.into(),
            city: None,
            state: None,
            country: None,
            lat,
            lon,
            place_type,
        }
    }

    /// Local checks run before any request is issued
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::Validation(
                "place name must not be empty".to_string(),
            ));
        }
        if !LatLng::new(self.lat, self.lon).is_valid() {
            return Err(crate::Error::InvalidCoordinates(format!(
                "lat {}, lon {}",
                self.lat, self.lon
            )));
        }
        Ok(())
    }
}

/// `POST /places/add`
#[derive(Debug, Clone, Deserialize)]
pub struct AddPlaceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub place: Option<RawPlace>,
    #[serde(default)]
    pub role: Option<String>,
}

impl AddPlaceResponse {
    /// The created place, normalized
    pub fn into_place(self) -> Option<Place> {
        self.place.map(RawPlace::into_place)
    }
}

/// `POST /places/upload-csv`, as the server sends it
#[derive(Debug, Clone, Deserialize)]
pub struct CsvUploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub summary: RawImportCounts,
    /// Row-level problems, capped server-side at 20 entries
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImportCounts {
    pub inserted: u64,
    pub skipped: u64,
    pub total_rows: u64,
}

impl CsvUploadResponse {
    pub fn into_summary(self) -> ImportSummary {
        ImportSummary {
            inserted: self.summary.inserted,
            skipped: self.summary.skipped,
            total_rows: self.summary.total_rows,
            errors: self.errors,
        }
    }
}

/// Outcome of a CSV bulk import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub inserted: u64,
    pub skipped: u64,
    pub total_rows: u64,
    pub errors: Vec<String>,
}

/// Account identity as the user system reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUser {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `POST /api/users/register`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRegistered {
    #[serde(default)]
    pub success: bool,
    pub user: AccountUser,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/users/login`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLogin {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<AccountUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Per-list counters shown on the profile screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountStatistics {
    #[serde(default)]
    pub visited_count: u64,
    #[serde(default)]
    pub wishlist_count: u64,
    #[serde(default)]
    pub liked_count: u64,
}

/// `GET /api/users/profile`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountProfile {
    pub user: AccountUser,
    #[serde(default)]
    pub statistics: Option<AccountStatistics>,
}

/// `GET /api/user/place-status/<id>` returns exactly the three flags
pub type PlaceStatus = ListStatus;

/// One group row from the group endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub your_role: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub member_count: Option<u64>,
}

/// One member row from the group details endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// `GET /api/groups/<id>`
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDetails {
    pub group: GroupSummary,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

/// `POST /api/groups`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupResponse {
    #[serde(default)]
    pub success: bool,
    pub group: GroupSummary,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /api/groups`
#[derive(Debug, Clone, Deserialize)]
pub struct GroupsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub groups: Vec<GroupSummary>,
}

/// Generic `{success, message}` acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body the backend attaches to non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The most specific text available
    pub fn text(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> PlacePage {
        serde_json::from_str::<PlacesPayload>(json)
            .unwrap()
            .into_page()
    }

    #[test]
    fn test_all_three_collection_shapes_decode_identically() {
        let record = r#"{"id": 1, "name": "Alpha", "lat": 40.0, "lon": -74.0}"#;
        let features = decode(&format!(r#"{{"features": [{record}], "count": 1}}"#));
        let places = decode(&format!(r#"{{"places": [{record}], "count": 1}}"#));
        let bare = decode(&format!("[{record}]"));

        assert_eq!(features.places, places.places);
        assert_eq!(places.places, bare.places);
        assert_eq!(features.count, 1);
        assert_eq!(bare.count, 1);
    }

    #[test]
    fn test_coordinate_aliases_and_numeric_strings() {
        let page = decode(
            r#"{"places": [
                {"id": 1, "name": "A", "latitude": 40.5, "longitude": "-74.25"},
                {"id": 2, "name": "B", "lat": "41.0", "lon": -73.5}
            ]}"#,
        );
        assert_eq!(
            page.places[0].position,
            Some(LatLng::new(40.5, -74.25))
        );
        assert_eq!(page.places[1].position, Some(LatLng::new(41.0, -73.5)));
    }

    #[test]
    fn test_unusable_coordinates_decode_without_marker_position() {
        let page = decode(
            r#"{"features": [
                {"id": 1, "name": "NoCoords"},
                {"id": 2, "name": "Garbage", "lat": "not a number", "lon": -70.0},
                {"id": 3, "name": "OutOfRange", "lat": 95.0, "lon": 0.0}
            ]}"#,
        );
        assert_eq!(page.places.len(), 3);
        assert!(page.places.iter().all(|p| p.position.is_none()));
    }

    #[test]
    fn test_membership_flags_nested_and_flat() {
        let page = decode(
            r#"{"places": [
                {"id": 1, "name": "Nested", "list_status": {"visited": true}},
                {"id": 2, "name": "Flat", "liked": true},
                {"id": 3, "name": "None"}
            ]}"#,
        );
        assert!(page.places[0].status().visited);
        assert!(page.places[1].status().liked);
        assert!(page.places[2].list_status.is_none());
    }

    #[test]
    fn test_unknown_place_kind_decodes_to_none() {
        let page = decode(r#"[{"id": 1, "name": "X", "place_type": "volcano"}]"#);
        assert_eq!(page.places[0].kind, None);

        let page = decode(r#"[{"id": 2, "name": "Y", "place_type": "brewery"}]"#);
        assert_eq!(page.places[0].kind, Some(PlaceKind::Brewery));
    }

    #[test]
    fn test_reference_location_and_count_fallback() {
        let page = decode(
            r#"{"places": [{"id": 1, "name": "A"}],
                "reference_location": {"lat": 44.0, "lon": -72.0}}"#,
        );
        assert_eq!(page.reference_location, Some(LatLng::new(44.0, -72.0)));
        assert_eq!(page.count, 1);
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let page = decode(
            r#"[{"id": 1, "name": "A", "brewery_style": "ipa", "visited_at": "2024-01-01"}]"#,
        );
        let extra = &page.places[0].extra;
        assert_eq!(extra.get("brewery_style"), Some(&Value::from("ipa")));
        assert!(extra.contains_key("visited_at"));
    }

    #[test]
    fn test_csv_upload_response_flattens_to_summary() {
        let response: CsvUploadResponse = serde_json::from_str(
            r#"{"success": true, "message": "CSV upload completed",
                "summary": {"inserted": 40, "skipped": 2, "total_rows": 42},
                "errors": ["Row 7: missing name"], "error_count": 1}"#,
        )
        .unwrap();
        let summary = response.into_summary();
        assert_eq!(summary.inserted, 40);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total_rows, 42);
        assert_eq!(summary.errors, vec!["Row 7: missing name".to_string()]);
    }

    #[test]
    fn test_auth_check_role_spellings() {
        let check: AuthCheck = serde_json::from_str(
            r#"{"authenticated": true, "user_role": "app_user", "permissions": ["SELECT"]}"#,
        )
        .unwrap();
        assert_eq!(check.effective_role(), Some("app_user"));

        let check: AuthCheck =
            serde_json::from_str(r#"{"authenticated": false, "available_roles": ["viewer_user"]}"#)
                .unwrap();
        assert_eq!(check.effective_role(), None);
    }

    #[test]
    fn test_place_draft_validation() {
        let draft = PlaceDraft::new("Hop Yard", 44.5, -73.2, PlaceKind::Brewery);
        assert!(draft.validate().is_ok());

        let unnamed = PlaceDraft::new("   ", 44.5, -73.2, PlaceKind::Brewery);
        assert!(unnamed.validate().is_err());

        let off_globe = PlaceDraft::new("Nowhere", 91.0, 0.0, PlaceKind::Hotel);
        assert!(off_globe.validate().is_err());
    }
}
