//! Point, cluster and viewport data model

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

/// A geo-located marker record supplied by the caller
///
/// `id` identifies the point within one clustering pass; `payload` is opaque
/// to the engine and handed back through the render callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point<P = ()> {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub payload: P,
}

impl<P> Point<P> {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, payload: P) -> Self {
        Point {
            id: id.into(),
            lat,
            lng,
            payload,
        }
    }
}

impl Point<()> {
    /// Point without payload
    pub fn bare(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Point::new(id, lat, lng, ())
    }
}

/// Immutable input of one clustering pass, in caller order
///
/// Duplicate ids are a caller error and are not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStore<P = ()> {
    points: Vec<Point<P>>,
}

impl<P> PointStore<P> {
    pub fn new(points: Vec<Point<P>>) -> Self {
        PointStore { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point<P>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point<P>> {
        self.points.iter()
    }

    /// Keeps only the points inside `bounds`, preserving order
    pub fn within(self, bounds: &Bounds) -> Self {
        PointStore {
            points: self
                .points
                .into_iter()
                .filter(|p| bounds.contains(p.lat, p.lng))
                .collect(),
        }
    }
}

impl<P> From<Vec<Point<P>>> for PointStore<P> {
    fn from(points: Vec<Point<P>>) -> Self {
        PointStore::new(points)
    }
}

impl<P> FromIterator<Point<P>> for PointStore<P> {
    fn from_iter<I: IntoIterator<Item = Point<P>>>(iter: I) -> Self {
        PointStore::new(iter.into_iter().collect())
    }
}

/// Cluster identity, derived from the set of member point ids
///
/// Two clusters with the same members get the same id regardless of their
/// position in the output or the order members were absorbed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn from_member_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<&str> = ids.into_iter().collect();
        sorted.sort_unstable();

        // Ids are joined with a unit separator so ["ab","c"] and ["a","bc"] differ
        let mut buf = Vec::with_capacity(sorted.iter().map(|s| s.len() + 1).sum());
        for id in sorted {
            buf.extend_from_slice(id.as_bytes());
            buf.push(0x1f);
        }

        ClusterId(format!("c{:016x}", xxh64(&buf, 0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        ClusterId(s.to_string())
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cluster represents one group produced by a clustering pass
///
/// `lat`/`lng` is the centroid of the members' raw coordinates. Members keep
/// the order they were absorbed in, seed first.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<P = ()> {
    pub id: ClusterId,
    pub lat: f64,
    pub lng: f64,
    pub members: Vec<Point<P>>,
}

impl<P> Cluster<P> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Single-member clusters are drawn as the point itself
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Recomputes the centroid from the members, `None` for an empty cluster
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.members.is_empty() {
            return None;
        }

        let n = self.members.len() as f64;
        let (lat, lng) = self
            .members
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
        Some((lat / n, lng / n))
    }
}

/// Geographic bounding box
///
/// A box whose `west` edge is east of its `east` edge crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Bounds {
            south,
            west,
            north,
            east,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.west <= self.east {
            self.west <= lng && lng <= self.east
        } else {
            lng >= self.west || lng <= self.east
        }
    }
}

/// What the map collaborator reports on every view change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    /// Visible area; points outside are skipped before clustering
    pub bounds: Option<Bounds>,
}

impl Viewport {
    pub fn at_zoom(zoom: f64) -> Self {
        Viewport { zoom, bounds: None }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}
