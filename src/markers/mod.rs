//! Marker synchronization
//!
//! Reconciles rendered map markers with the current filtered place
//! list. The policy is teardown-and-rebuild: on every change all
//! existing markers and any cluster overlay are destroyed first, then
//! the new list is rendered from scratch. That keeps the invariant of
//! at most one marker per visible place without diffing, and makes a
//! repeated rebuild with the same input converge to the same state.

pub mod backend;
pub mod cluster;
pub mod headless;

use crate::core::config::MarkerConfig;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::place::{Place, PlaceId};
use backend::{ClusterHandle, MarkerBackend, MarkerEvent, MarkerHandle};
use crossbeam_channel::Receiver;
use fxhash::FxHashMap;
use instant::Instant;

/// One place waiting to be rendered
#[derive(Debug, Clone)]
struct MarkerSpec {
    place_id: PlaceId,
    position: LatLng,
    title: String,
}

struct PendingRebuild {
    specs: Vec<MarkerSpec>,
    due: Instant,
}

/// Owns every marker handle and the cluster overlay.
///
/// Nothing else in the engine may hold marker handles; interactions
/// come back through the backend's event stream.
pub struct MarkerSynchronizer {
    backend: Box<dyn MarkerBackend>,
    events: Receiver<MarkerEvent>,
    config: MarkerConfig,
    markers: FxHashMap<PlaceId, Box<dyn MarkerHandle>>,
    cluster: Option<Box<dyn ClusterHandle>>,
    selected: Option<PlaceId>,
    pending: Option<PendingRebuild>,
}

impl MarkerSynchronizer {
    pub fn new(backend: Box<dyn MarkerBackend>, config: MarkerConfig) -> Self {
        let events = backend.events();
        Self {
            backend,
            events,
            config,
            markers: FxHashMap::default(),
            cluster: None,
            selected: None,
            pending: None,
        }
    }

    /// Live markers, clustered or directly attached
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_clustered(&self) -> bool {
        self.cluster.is_some()
    }

    pub fn selected(&self) -> Option<PlaceId> {
        self.selected
    }

    pub fn select(&mut self, place_id: Option<PlaceId>) {
        self.selected = place_id;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedules a rebuild for the given filtered list.
    ///
    /// Places without usable coordinates are dropped here; they stay in
    /// the textual list but never reach the map. A later `schedule`
    /// before the deferral elapses replaces the pending list outright,
    /// so only the latest input is ever rendered.
    pub fn schedule(&mut self, places: &[Place]) {
        let specs = places
            .iter()
            .filter_map(|place| {
                place.mappable().map(|(place_id, position)| MarkerSpec {
                    place_id,
                    position,
                    title: place.name.clone(),
                })
            })
            .collect();
        self.pending = Some(PendingRebuild {
            specs,
            due: Instant::now() + self.config.rebuild_delay,
        });
    }

    /// Applies the pending rebuild once its deferral has elapsed.
    /// Returns `true` when a rebuild ran.
    pub fn tick(&mut self) -> bool {
        match &self.pending {
            Some(pending) if Instant::now() >= pending.due => {
                let specs = self.pending.take().map(|p| p.specs).unwrap_or_default();
                self.rebuild(specs);
                true
            }
            _ => false,
        }
    }

    /// Applies any pending rebuild immediately
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                self.rebuild(pending.specs);
                true
            }
            None => false,
        }
    }

    /// Immediate teardown-and-rebuild, bypassing the deferral
    pub fn sync_now(&mut self, places: &[Place]) {
        self.schedule(places);
        self.flush();
    }

    /// Drains interaction events. Each click selects the place and,
    /// when configured, recenters the map on its marker.
    pub fn pump_events(&mut self) -> Vec<PlaceId> {
        let mut clicked = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                MarkerEvent::Clicked(place_id) => {
                    let Some(handle) = self.markers.get(&place_id) else {
                        // Click raced a rebuild that removed the marker
                        continue;
                    };
                    let position = handle.position();
                    self.selected = Some(place_id);
                    if self.config.click_to_focus {
                        self.backend.set_view(position, self.config.focus_zoom);
                    }
                    clicked.push(place_id);
                }
            }
        }
        clicked
    }

    /// Removes every marker and any cluster overlay
    pub fn teardown(&mut self) {
        if let Some(mut cluster) = self.cluster.take() {
            cluster.teardown();
        }
        for (_, mut handle) in self.markers.drain() {
            handle.detach();
        }
    }

    fn rebuild(&mut self, specs: Vec<MarkerSpec>) {
        // Teardown first, unconditionally, even for an empty list
        self.teardown();

        if specs.is_empty() {
            self.selected = None;
            return;
        }

        for spec in specs {
            if self.markers.contains_key(&spec.place_id) {
                continue;
            }
            match self
                .backend
                .create_marker(spec.place_id, spec.position, &spec.title)
            {
                Ok(handle) => {
                    self.markers.insert(spec.place_id, handle);
                }
                Err(e) => {
                    log::warn!("marker creation failed for place {}: {e}", spec.place_id);
                }
            }
        }

        let members: Vec<(PlaceId, LatLng)> = self
            .markers
            .values()
            .map(|m| (m.place_id(), m.position()))
            .collect();

        let clustered = members.len() >= self.config.cluster_threshold
            && self.backend.cluster_ready()
            && match self.backend.build_cluster(&members) {
                Ok(cluster) => {
                    self.cluster = Some(cluster);
                    true
                }
                Err(e) => {
                    // The map must never end up empty because the
                    // clustering library misbehaved
                    log::warn!("cluster construction failed, attaching directly: {e}");
                    false
                }
            };

        if !clustered {
            for handle in self.markers.values_mut() {
                if let Err(e) = handle.attach() {
                    log::warn!("marker attach failed for place {}: {e}", handle.place_id());
                }
            }
        }

        // Keep the selection only while its marker survives rebuilds
        if let Some(selected) = self.selected {
            if !self.markers.contains_key(&selected) {
                self.selected = None;
            }
        }

        if self.config.fit_bounds {
            if let Some(bounds) =
                LatLngBounds::from_points(members.iter().map(|(_, position)| *position))
            {
                let max_zoom = if members.len() == 1 {
                    Some(self.config.single_marker_max_zoom)
                } else {
                    None
                };
                self.backend.fit_bounds(&bounds, max_zoom);
            }
        }
    }
}

impl Drop for MarkerSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}
