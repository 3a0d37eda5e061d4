//! Headless marker backend
//!
//! Renders nothing; instead it records every operation a real map
//! library would have performed. Tests assert on the op log and the
//! live marker registry, and `simulate_click` feeds the same event
//! stream a real backend would.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::place::PlaceId;
use crate::markers::backend::{ClusterHandle, MarkerBackend, MarkerEvent, MarkerHandle};
use crate::markers::cluster::{grid_cluster, GridClusterConfig};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use fxhash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Mutex};

/// One recorded backend operation
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    MarkerCreated(PlaceId),
    MarkerAttached(PlaceId),
    MarkerDetached(PlaceId),
    ClusterBuilt { members: usize, groups: usize },
    ClusterTornDown,
    BoundsFitted { bounds: LatLngBounds, max_zoom: Option<f64> },
    ViewSet { center: LatLng, zoom: f64 },
}

#[derive(Default)]
struct HeadlessState {
    ops: Vec<BackendOp>,
    /// Every live (not yet dropped) marker handle
    live: FxHashMap<PlaceId, LatLng>,
    /// Markers currently attached directly to the map
    attached: FxHashSet<PlaceId>,
    /// Members of the active cluster overlay, if any
    cluster_members: Vec<PlaceId>,
    cluster_ready: bool,
    fail_next_cluster: bool,
    viewport: Option<(LatLng, f64)>,
}

/// Recording [`MarkerBackend`]. Cloning shares the underlying state,
/// so a test can keep one clone for assertions after handing the other
/// to the synchronizer.
#[derive(Clone)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
    events_tx: Sender<MarkerEvent>,
    events_rx: Receiver<MarkerEvent>,
    cluster_config: GridClusterConfig,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        let state = HeadlessState {
            cluster_ready: true,
            ..HeadlessState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events_tx,
            events_rx,
            cluster_config: GridClusterConfig::default(),
        }
    }

    /// A backend whose clustering library has not loaded yet
    pub fn with_cluster_unready() -> Self {
        let backend = Self::new();
        backend.set_cluster_ready(false);
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_cluster_ready(&self, ready: bool) {
        self.lock().cluster_ready = ready;
    }

    /// Makes the next `build_cluster` call fail, once
    pub fn fail_next_cluster(&self) {
        self.lock().fail_next_cluster = true;
    }

    /// Emits a click event for `place_id` if it has a live marker
    pub fn simulate_click(&self, place_id: PlaceId) -> bool {
        if !self.lock().live.contains_key(&place_id) {
            return false;
        }
        self.events_tx.send(MarkerEvent::Clicked(place_id)).is_ok()
    }

    pub fn ops(&self) -> Vec<BackendOp> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Place ids with a live marker handle, in no particular order
    pub fn live_marker_ids(&self) -> Vec<PlaceId> {
        self.lock().live.keys().copied().collect()
    }

    pub fn live_marker_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn attached_count(&self) -> usize {
        self.lock().attached.len()
    }

    pub fn is_attached(&self, place_id: PlaceId) -> bool {
        self.lock().attached.contains(&place_id)
    }

    /// Members of the active cluster overlay, or `None` without one
    pub fn cluster_members(&self) -> Option<Vec<PlaceId>> {
        let state = self.lock();
        if state.cluster_members.is_empty() {
            None
        } else {
            Some(state.cluster_members.clone())
        }
    }

    pub fn viewport(&self) -> Option<(LatLng, f64)> {
        self.lock().viewport
    }

    pub fn last_fitted_bounds(&self) -> Option<(LatLngBounds, Option<f64>)> {
        self.lock().ops.iter().rev().find_map(|op| match op {
            BackendOp::BoundsFitted { bounds, max_zoom } => Some((bounds.clone(), *max_zoom)),
            _ => None,
        })
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerBackend for HeadlessBackend {
    fn cluster_ready(&self) -> bool {
        self.lock().cluster_ready
    }

    fn create_marker(
        &mut self,
        place_id: PlaceId,
        position: LatLng,
        _title: &str,
    ) -> Result<Box<dyn MarkerHandle>> {
        let mut state = self.lock();
        state.live.insert(place_id, position);
        state.ops.push(BackendOp::MarkerCreated(place_id));
        drop(state);

        Ok(Box::new(HeadlessMarker {
            state: Arc::clone(&self.state),
            place_id,
            position,
            attached: false,
        }))
    }

    fn build_cluster(&mut self, members: &[(PlaceId, LatLng)]) -> Result<Box<dyn ClusterHandle>> {
        let mut state = self.lock();
        if state.fail_next_cluster {
            state.fail_next_cluster = false;
            return Err(crate::Error::Backend(
                "cluster construction failed".to_string(),
            ));
        }

        let groups = grid_cluster(members, &self.cluster_config);
        state.cluster_members = members.iter().map(|(id, _)| *id).collect();
        state.ops.push(BackendOp::ClusterBuilt {
            members: members.len(),
            groups: groups.len(),
        });
        drop(state);

        Ok(Box::new(HeadlessCluster {
            state: Arc::clone(&self.state),
            member_count: members.len(),
            torn_down: false,
        }))
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, max_zoom: Option<f64>) {
        let mut state = self.lock();
        state.viewport = Some((bounds.center(), max_zoom.unwrap_or(10.0)));
        state.ops.push(BackendOp::BoundsFitted {
            bounds: bounds.clone(),
            max_zoom,
        });
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        let mut state = self.lock();
        state.viewport = Some((center, zoom));
        state.ops.push(BackendOp::ViewSet { center, zoom });
    }

    fn events(&self) -> Receiver<MarkerEvent> {
        self.events_rx.clone()
    }
}

struct HeadlessMarker {
    state: Arc<Mutex<HeadlessState>>,
    place_id: PlaceId,
    position: LatLng,
    attached: bool,
}

impl HeadlessMarker {
    fn lock(&self) -> std::sync::MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MarkerHandle for HeadlessMarker {
    fn place_id(&self) -> PlaceId {
        self.place_id
    }

    fn position(&self) -> LatLng {
        self.position
    }

    fn attach(&mut self) -> Result<()> {
        if self.attached {
            return Ok(());
        }
        let mut state = self.lock();
        state.attached.insert(self.place_id);
        state.ops.push(BackendOp::MarkerAttached(self.place_id));
        drop(state);
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        let mut state = self.lock();
        state.attached.remove(&self.place_id);
        state.ops.push(BackendOp::MarkerDetached(self.place_id));
        drop(state);
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Drop for HeadlessMarker {
    fn drop(&mut self) {
        self.detach();
        self.lock().live.remove(&self.place_id);
    }
}

struct HeadlessCluster {
    state: Arc<Mutex<HeadlessState>>,
    member_count: usize,
    torn_down: bool,
}

impl ClusterHandle for HeadlessCluster {
    fn member_count(&self) -> usize {
        self.member_count
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.cluster_members.clear();
        state.ops.push(BackendOp::ClusterTornDown);
        self.torn_down = true;
    }
}

impl Drop for HeadlessCluster {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lifecycle_is_recorded() {
        let mut backend = HeadlessBackend::new();
        let mut marker = backend
            .create_marker(1, LatLng::new(44.0, -73.0), "Foam")
            .unwrap();

        marker.attach().unwrap();
        marker.attach().unwrap(); // idempotent
        assert_eq!(backend.attached_count(), 1);

        marker.detach();
        assert_eq!(backend.attached_count(), 0);

        drop(marker);
        assert_eq!(backend.live_marker_count(), 0);
        assert_eq!(
            backend.ops(),
            vec![
                BackendOp::MarkerCreated(1),
                BackendOp::MarkerAttached(1),
                BackendOp::MarkerDetached(1),
            ]
        );
    }

    #[test]
    fn test_dropping_attached_marker_detaches_it() {
        let mut backend = HeadlessBackend::new();
        let mut marker = backend
            .create_marker(2, LatLng::new(44.0, -73.0), "x")
            .unwrap();
        marker.attach().unwrap();
        drop(marker);

        assert_eq!(backend.attached_count(), 0);
        assert!(backend.ops().contains(&BackendOp::MarkerDetached(2)));
    }

    #[test]
    fn test_cluster_build_and_teardown() {
        let mut backend = HeadlessBackend::new();
        let members = vec![
            (1, LatLng::new(44.0, -73.0)),
            (2, LatLng::new(44.01, -73.01)),
        ];
        let cluster = backend.build_cluster(&members).unwrap();
        assert_eq!(cluster.member_count(), 2);
        assert_eq!(backend.cluster_members(), Some(vec![1, 2]));

        drop(cluster);
        assert!(backend.cluster_members().is_none());
        assert!(backend.ops().contains(&BackendOp::ClusterTornDown));
    }

    #[test]
    fn test_fail_next_cluster_fails_once() {
        let mut backend = HeadlessBackend::new();
        backend.fail_next_cluster();
        let members = vec![(1, LatLng::new(44.0, -73.0))];
        assert!(backend.build_cluster(&members).is_err());
        assert!(backend.build_cluster(&members).is_ok());
    }

    #[test]
    fn test_simulate_click_requires_live_marker() {
        let mut backend = HeadlessBackend::new();
        assert!(!backend.simulate_click(5));

        let _marker = backend
            .create_marker(5, LatLng::new(44.0, -73.0), "x")
            .unwrap();
        assert!(backend.simulate_click(5));
        assert_eq!(
            backend.events().try_recv(),
            Ok(MarkerEvent::Clicked(5))
        );
    }
}
