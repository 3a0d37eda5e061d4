use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned place identifier
pub type PlaceId = i64;

/// Category of a place, snake_case on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    Brewery,
    Restaurant,
    TouristPlace,
    Hotel,
}

impl PlaceKind {
    pub const ALL: [PlaceKind; 4] = [
        PlaceKind::Brewery,
        PlaceKind::Restaurant,
        PlaceKind::TouristPlace,
        PlaceKind::Hotel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceKind::Brewery => "brewery",
            PlaceKind::Restaurant => "restaurant",
            PlaceKind::TouristPlace => "tourist_place",
            PlaceKind::Hotel => "hotel",
        }
    }
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brewery" => Ok(PlaceKind::Brewery),
            "restaurant" => Ok(PlaceKind::Restaurant),
            "tourist_place" => Ok(PlaceKind::TouristPlace),
            "hotel" => Ok(PlaceKind::Hotel),
            other => Err(crate::Error::Validation(format!(
                "unknown place kind: {other:?}"
            ))),
        }
    }
}

/// Which personal list a membership operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Visited,
    Wishlist,
    Liked,
}

impl ListKind {
    /// URL path segment for the personal-list endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Visited => "visited",
            ListKind::Wishlist => "wishlist",
            ListKind::Liked => "liked",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership flags across the three personal lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStatus {
    #[serde(default)]
    pub visited: bool,
    #[serde(default)]
    pub in_wishlist: bool,
    #[serde(default)]
    pub liked: bool,
}

impl ListStatus {
    pub fn get(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Visited => self.visited,
            ListKind::Wishlist => self.in_wishlist,
            ListKind::Liked => self.liked,
        }
    }

    pub fn set(&mut self, kind: ListKind, member: bool) {
        match kind {
            ListKind::Visited => self.visited = member,
            ListKind::Wishlist => self.in_wishlist = member,
            ListKind::Liked => self.liked = member,
        }
    }

    pub fn any(&self) -> bool {
        self.visited || self.in_wishlist || self.liked
    }
}

/// A place record as the engine sees it.
///
/// `position` is `None` when the record arrived without usable
/// coordinates; such a place stays in result lists but never gets a
/// marker. `list_status` is populated only while an account session
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<PlaceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_status: Option<ListStatus>,
    /// Category-specific attributes passed through untouched
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Place {
    pub fn new(id: PlaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            city: None,
            state: None,
            country: None,
            kind: None,
            position: None,
            distance_km: None,
            list_status: None,
            extra: serde_json::Map::new(),
        }
    }

    /// The id/position pair when this place can be placed on the map
    pub fn mappable(&self) -> Option<(PlaceId, LatLng)> {
        self.position
            .filter(|p| p.is_valid())
            .map(|p| (self.id, p))
    }

    /// Current membership flags, defaulting to all-false
    pub fn status(&self) -> ListStatus {
        self.list_status.unwrap_or_default()
    }

    /// Membership flags for in-place patching
    pub fn status_mut(&mut self) -> &mut ListStatus {
        self.list_status.get_or_insert_with(ListStatus::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_kind_round_trip() {
        for kind in PlaceKind::ALL {
            let parsed: PlaceKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("  Brewery ".parse::<PlaceKind>().is_ok());
        assert!("castle".parse::<PlaceKind>().is_err());
    }

    #[test]
    fn test_list_status_flags() {
        let mut status = ListStatus::default();
        assert!(!status.any());

        status.set(ListKind::Wishlist, true);
        assert!(status.get(ListKind::Wishlist));
        assert!(!status.get(ListKind::Visited));
        assert!(status.any());

        status.set(ListKind::Wishlist, false);
        assert!(!status.any());
    }

    #[test]
    fn test_mappable_requires_valid_position() {
        let mut place = Place::new(7, "Hilltop");
        assert!(place.mappable().is_none());

        place.position = Some(LatLng::new(40.0, -74.0));
        assert_eq!(place.mappable(), Some((7, LatLng::new(40.0, -74.0))));

        place.position = Some(LatLng::new(99.0, 0.0));
        assert!(place.mappable().is_none());
    }
}
