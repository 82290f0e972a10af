use bitvec::prelude::*;
use tracing::debug;

use super::kdtree::new_kd_tree;
use super::point::{Cluster, ClusterId, Point, PointStore};
use super::projection::project;
use crate::config::DEFAULT_TILE_SIZE;

// Greedy nearest-to-seed grouping:
//
// cluster(D, threshold, zoom)
//    project every P in D at zoom
//    for each unassigned point S in D, in input order
//       open cluster C seeded with S
//       for each later unassigned point P, in input order
//          if dist(S, P) <= threshold
//             add P to C, update C's centroid (running mean of raw lat/lng)
//
// A point reachable from several seeds joins the first one, since earlier
// seeds absorb before later seeds are opened. Members of one cluster can be
// up to 2 * threshold apart: absorption is only measured against the seed.

/// Clusters a pass of points for markers drawn at `zoom`
///
/// `proximity_threshold` is in pixels of a 256 px tile world; see
/// [`cluster_with_tile_size`] for other tile sizes.
pub fn cluster<P: Clone>(
    points: &PointStore<P>,
    proximity_threshold: f64,
    zoom: f64,
) -> Vec<Cluster<P>> {
    cluster_with_tile_size(points, proximity_threshold, zoom, DEFAULT_TILE_SIZE)
}

/// Clusters incoming points with greedy seed absorption
///
/// # Arguments
///
/// * `points` - Points of this pass, in caller-stable order
/// * `proximity_threshold` - Maximum seed distance in pixels; `<= 0` disables clustering
/// * `zoom` - Map zoom the distances are measured at
/// * `tile_size` - Tile edge in pixels
///
/// # Returns
///
/// Clusters in seed order. Every input point is in exactly one of them.
pub fn cluster_with_tile_size<P: Clone>(
    points: &PointStore<P>,
    proximity_threshold: f64,
    zoom: f64,
    tile_size: f64,
) -> Vec<Cluster<P>> {
    let points = points.points();
    if points.is_empty() {
        return Vec::new();
    }

    // Also catches NaN
    if !(proximity_threshold > 0.0) {
        debug!(points = points.len(), "clustering disabled, emitting singletons");
        return points.iter().map(|p| singleton(p.clone())).collect();
    }

    let projected = points.iter().map(|p| project(p, zoom, tile_size)).collect();
    let kd_tree = new_kd_tree(projected);

    let mut assigned = bitvec![0; points.len()];
    let mut clusters = Vec::new();
    let mut neighbours = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        assigned.set(seed, true);

        neighbours.clear();
        neighbours = kd_tree.in_range(&kd_tree.points[seed], proximity_threshold, neighbours);
        // Absorb in input order
        neighbours.sort_unstable();

        let seed_point = &points[seed];
        let mut lat = seed_point.lat;
        let mut lng = seed_point.lng;
        let mut members = vec![seed_point.clone()];

        for &k in &neighbours {
            if assigned[k] {
                continue;
            }
            assigned.set(k, true);

            let p = &points[k];
            members.push(p.clone());
            let n = members.len() as f64;
            lat += (p.lat - lat) / n;
            lng += (p.lng - lng) / n;
        }

        clusters.push(Cluster {
            id: ClusterId::from_member_ids(members.iter().map(|m| m.id.as_str())),
            lat,
            lng,
            members,
        });
    }

    debug!(
        points = points.len(),
        clusters = clusters.len(),
        zoom,
        threshold = proximity_threshold,
        "clustering pass done"
    );

    clusters
}

fn singleton<P>(point: Point<P>) -> Cluster<P> {
    Cluster {
        id: ClusterId::from_member_ids([point.id.as_str()]),
        lat: point.lat,
        lng: point.lng,
        members: vec![point],
    }
}
