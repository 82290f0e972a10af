use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::cluster::{Cluster, DEGREE_RAD};
use crate::config::SpiderConfig;
use crate::error::SpiderError;

/// Where one member of an expanded cluster is drawn, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiralPosition {
    pub point_id: String,
    pub lat: f64,
    pub lng: f64,
    /// Delay from the start of the expansion until this member appears
    pub reveal_delay_ms: u64,
}

/// Radial layout of a cluster's members around its centroid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralLayout {
    /// Radius in degrees of latitude
    pub radius_deg: f64,
    pub stagger_ms: u64,
}

impl SpiralLayout {
    pub fn new(radius_deg: f64, stagger_ms: u64) -> Self {
        SpiralLayout {
            radius_deg,
            stagger_ms,
        }
    }

    pub fn from_config(config: &SpiderConfig) -> Self {
        SpiralLayout::new(config.radius_deg, config.stagger_ms)
    }

    /// Computes the expanded position of every member, in member order
    ///
    /// Member `i` of `n` sits at angle `i * 2π/n`, measured from north towards
    /// east. The longitude offset is stretched by `1 / cos(lat)` so the ring
    /// stays round on the ground; near the poles this blows up and is left as
    /// is. Longitudes are not wrapped at the antimeridian.
    pub fn layout<P>(&self, cluster: &Cluster<P>) -> Result<Vec<SpiralPosition>, SpiderError> {
        if cluster.count() <= 1 {
            return Err(SpiderError::SingletonCluster(cluster.id.clone()));
        }

        let lng_stretch = (cluster.lat * DEGREE_RAD).cos();

        Ok(unit_offsets(cluster.count())
            .into_iter()
            .zip(&cluster.members)
            .enumerate()
            .map(|(i, ((north, east), member))| SpiralPosition {
                point_id: member.id.clone(),
                lat: cluster.lat + self.radius_deg * north,
                lng: cluster.lng + self.radius_deg * east / lng_stretch,
                reveal_delay_ms: i as u64 * self.stagger_ms,
            })
            .collect())
    }
}

/// `(cos, sin)` of `n` equally spaced angles starting at 0
pub fn unit_offsets(n: usize) -> Vec<(f64, f64)> {
    if n == 0 {
        return Vec::new();
    }
    let step = TAU / n as f64;
    (0..n)
        .map(|i| {
            let angle = i as f64 * step;
            (angle.cos(), angle.sin())
        })
        .collect()
}
