//! Grid clustering over marker positions
//!
//! Used by the headless backend to decide what its cluster overlay
//! would draw. Points are bucketed into fixed-size lat/lng cells;
//! buckets below the minimum size fall out as singletons.

use crate::core::geo::LatLng;
use crate::core::place::PlaceId;
use fxhash::FxHashMap;

/// Settings for [`grid_cluster`]
#[derive(Debug, Clone, PartialEq)]
pub struct GridClusterConfig {
    /// Cell edge length in degrees
    pub cell_size_deg: f64,
    /// Buckets smaller than this render as individual pins
    pub min_cluster_size: usize,
}

impl Default for GridClusterConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: 0.5,
            min_cluster_size: 2,
        }
    }
}

/// One rendered group of nearby markers
#[derive(Debug, Clone, PartialEq)]
pub struct GridCluster {
    /// Mean position of the members
    pub center: LatLng,
    pub members: Vec<PlaceId>,
}

impl GridCluster {
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

/// Buckets `points` into grid cells and returns one cluster per
/// populated cell, splitting undersized cells into singletons.
///
/// Output order follows first appearance in the input, so repeated
/// calls over the same input produce the same result.
pub fn grid_cluster(points: &[(PlaceId, LatLng)], config: &GridClusterConfig) -> Vec<GridCluster> {
    let cell = config.cell_size_deg.max(f64::EPSILON);

    let mut cells: FxHashMap<(i64, i64), Vec<(PlaceId, LatLng)>> = FxHashMap::default();
    let mut order: Vec<(i64, i64)> = Vec::new();

    for &(id, position) in points {
        let key = (
            (position.lat / cell).floor() as i64,
            (position.lng / cell).floor() as i64,
        );
        let bucket = cells.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        bucket.push((id, position));
    }

    let mut clusters = Vec::new();
    for key in order {
        let members = match cells.remove(&key) {
            Some(members) => members,
            None => continue,
        };
        if members.len() >= config.min_cluster_size {
            let center = mean_position(&members);
            clusters.push(GridCluster {
                center,
                members: members.into_iter().map(|(id, _)| id).collect(),
            });
        } else {
            for (id, position) in members {
                clusters.push(GridCluster {
                    center: position,
                    members: vec![id],
                });
            }
        }
    }
    clusters
}

fn mean_position(members: &[(PlaceId, LatLng)]) -> LatLng {
    let n = members.len() as f64;
    let (lat, lng) = members
        .iter()
        .fold((0.0, 0.0), |(lat, lng), (_, p)| (lat + p.lat, lng + p.lng));
    LatLng::new(lat / n, lng / n)
}
