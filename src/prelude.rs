//! Prelude module for common placelet types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use placelet::prelude::*;`

pub use crate::core::{
    config::{ApiConfig, ExplorerConfig, GeolocationConfig, MarkerConfig},
    geo::{LatLng, LatLngBounds},
    place::{ListKind, ListStatus, Place, PlaceId, PlaceKind},
};

pub use crate::api::{
    cache::ResponseCache,
    client::HttpApi,
    shapes::{
        AddPlaceResponse, AuthCheck, DensityReport, GroupDetails, GroupSummary, HealthStatus,
        ImportSummary, PermissionReport, PlaceDraft, PlaceStatus, Stats,
    },
    PlacesApi, SearchParams, SearchQuery,
};

pub use crate::session::{
    store::{CredentialSlot, CredentialStore, MemoryCredentialStore},
    AccountSession, RoleSession, SessionState,
};

pub use crate::results::{
    filter::filter_places, ApplyOutcome, RequestTicket, ResultSet, ResultSetManager, ViewMode,
};

pub use crate::markers::{
    backend::{ClusterHandle, MarkerBackend, MarkerEvent, MarkerHandle},
    headless::HeadlessBackend,
    MarkerSynchronizer,
};

pub use crate::explorer::{
    events::ExplorerEvent,
    geolocate::{FixedLocation, GeolocationProvider},
    Explorer,
};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as ExplorerError, Result};

pub use std::{pin::Pin, sync::Arc, time::Duration};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
