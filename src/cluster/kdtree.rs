//! 2-d K-D tree over projected points
//!
//! This code is heavily based on <https://godoc.org/code.google.com/p/eaburns/kdtree>
//!
//! Original code is under New BSD License.
//! Author: Ethan Burns <burns.ethan@gmail.com>
//!
//! Used by the clusterer to find a seed's neighbourhood without scanning the
//! whole pass. Results are exactly those of [`region_query`].

use super::projection::{PlanarPoint, planar_sq_dist};

/// KD-Tree implementation for efficient spatial queries
///
/// Points are separated from nodes. Nodes hold only indices into the points slice.
pub struct KDTree {
    /// All points in the tree
    pub points: Vec<PlanarPoint>,
    /// Root node of the tree
    pub root: Option<Box<KDTreeNode>>,
    /// Smallest longitude compression factor in the tree, used to bound x splits
    min_cos: f64,
}

/// A node in the K-D tree
pub struct KDTreeNode {
    /// Index of the point associated with this node
    pub point_id: usize,

    split: usize,
    left: Option<Box<KDTreeNode>>,
    right: Option<Box<KDTreeNode>>,
}

fn coord(p: &PlanarPoint, dim: usize) -> f64 {
    if dim == 0 { p.x } else { p.y }
}

impl KDTree {
    /// Finds all points within `dist` pixels of `pt`, boundary included
    ///
    /// To avoid allocation, the `nodes` vector can be pre-allocated with a larger
    /// capacity and re-used across multiple calls. Order of the result is unspecified.
    pub fn in_range(&self, pt: &PlanarPoint, dist: f64, mut nodes: Vec<usize>) -> Vec<usize> {
        // Also rejects NaN
        if !(dist >= 0.0) {
            return nodes;
        }
        self.in_range_recursive(self.root.as_deref(), pt, dist, &mut nodes);
        nodes
    }

    fn in_range_recursive(
        &self,
        t: Option<&KDTreeNode>,
        pt: &PlanarPoint,
        r: f64,
        nodes: &mut Vec<usize>,
    ) {
        let t = match t {
            None => return,
            Some(t) => t,
        };

        let node_pt = &self.points[t.point_id];
        let diff = coord(pt, t.split) - coord(node_pt, t.split);

        let (this_side, other_side) = if diff < 0.0 {
            (t.left.as_deref(), t.right.as_deref())
        } else {
            (t.right.as_deref(), t.left.as_deref())
        };

        // Lower bound of the distance from pt to anything across the split
        let plane_dist = if t.split == 0 {
            diff.abs() * ((pt.cos_lat + self.min_cos) / 2.0).max(0.0)
        } else {
            diff.abs()
        };

        self.in_range_recursive(this_side, pt, r, nodes);
        if plane_dist <= r {
            if planar_sq_dist(node_pt, pt) <= r * r {
                nodes.push(t.point_id);
            }
            self.in_range_recursive(other_side, pt, r, nodes);
        }
    }

    /// Returns the height of the K-D tree
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.height())
    }
}

impl KDTreeNode {
    fn height(&self) -> usize {
        let ht = self.left.as_ref().map_or(0, |l| l.height());
        let rht = self.right.as_ref().map_or(0, |r| r.height());
        ht.max(rht) + 1
    }
}

/// Creates a new K-D tree built from the given points
pub fn new_kd_tree(points: Vec<PlanarPoint>) -> KDTree {
    let min_cos = points
        .iter()
        .map(|p| p.cos_lat)
        .fold(f64::INFINITY, f64::min)
        .max(0.0);

    let mut ids: Vec<usize> = (0..points.len()).collect();
    let root = build_tree(&points, &mut ids, 0);

    KDTree {
        points,
        root,
        min_cos,
    }
}

/// Builds a node at the median of the split dimension
///
/// Everything left of the median is `<=` and everything right is `>=` the
/// pivot on that dimension, which is all the range query relies on.
fn build_tree(points: &[PlanarPoint], ids: &mut [usize], depth: usize) -> Option<Box<KDTreeNode>> {
    if ids.is_empty() {
        return None;
    }

    let split = depth % 2;
    let m = ids.len() / 2;
    ids.select_nth_unstable_by(m, |&a, &b| {
        coord(&points[a], split).total_cmp(&coord(&points[b], split))
    });

    let point_id = ids[m];
    let (left, rest) = ids.split_at_mut(m);
    let right = &mut rest[1..];

    Some(Box::new(KDTreeNode {
        point_id,
        split,
        left: build_tree(points, left, depth + 1),
        right: build_tree(points, right, depth + 1),
    }))
}

/// Simple O(N) way to find points in a neighbourhood
///
/// Equivalent to `kd_tree.in_range(p, eps, vec![])` up to ordering.
pub fn region_query(points: &[PlanarPoint], p: &PlanarPoint, eps: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, point)| planar_sq_dist(point, p) <= eps * eps)
        .map(|(i, _)| i)
        .collect()
}
