//! Package cluster groups geo points into map-marker clusters using a K-D Tree
pub mod greedy;
pub mod kdtree;
pub mod point;
pub mod projection;

#[cfg(test)]
mod greedy_test;

pub use greedy::{cluster, cluster_with_tile_size};
pub use kdtree::{KDTree, new_kd_tree, region_query};
pub use point::{Bounds, Cluster, ClusterId, Point, PointStore, Viewport};
pub use projection::{DEGREE_RAD, PlanarPoint, pixels_per_degree, planar_distance, project};
