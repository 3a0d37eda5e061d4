//! Rendering seam for map markers
//!
//! The synchronizer never touches a map library directly; it drives
//! these traits instead. A production build wires them to a real map
//! widget (or a JS bridge under `wasm`), tests and the demo app use
//! [`crate::markers::headless::HeadlessBackend`].

use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::place::PlaceId;
use crate::Result;
use crossbeam_channel::Receiver;

/// Interactions arriving from the rendered map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    /// The user clicked the marker for this place
    Clicked(PlaceId),
}

/// One owned marker on (or off) the map.
///
/// Handles are created detached; the synchronizer decides whether to
/// attach them directly or hand the whole set to a cluster.
pub trait MarkerHandle: Send {
    fn place_id(&self) -> PlaceId;
    fn position(&self) -> LatLng;

    /// Puts the marker on the map. Attaching an already-attached
    /// marker is a no-op.
    fn attach(&mut self) -> Result<()>;

    /// Removes the marker from the map. Safe to call when detached.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;
}

/// An owned cluster overlay rendered in place of individual markers
pub trait ClusterHandle: Send {
    /// How many markers the cluster was built over
    fn member_count(&self) -> usize;

    /// Removes the cluster and everything it rendered
    fn teardown(&mut self);
}

/// Everything the synchronizer needs from a map rendering library
pub trait MarkerBackend: Send {
    /// Whether the clustering library has finished loading. Backends
    /// without deferred loading return `true` unconditionally.
    fn cluster_ready(&self) -> bool;

    /// Creates a detached marker handle for one place
    fn create_marker(
        &mut self,
        place_id: PlaceId,
        position: LatLng,
        title: &str,
    ) -> Result<Box<dyn MarkerHandle>>;

    /// Builds a cluster overlay over the given members. The caller
    /// keeps ownership of the underlying marker handles and leaves
    /// them detached while the cluster is alive.
    fn build_cluster(&mut self, members: &[(PlaceId, LatLng)]) -> Result<Box<dyn ClusterHandle>>;

    /// Fits the viewport to `bounds`, optionally capping the zoom the
    /// fit may reach
    fn fit_bounds(&mut self, bounds: &LatLngBounds, max_zoom: Option<f64>);

    /// Centers the viewport on a point at the given zoom
    fn set_view(&mut self, center: LatLng, zoom: f64);

    /// Stream of interactions from the rendered markers
    fn events(&self) -> Receiver<MarkerEvent>;
}
