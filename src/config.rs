use serde::{Deserialize, Serialize};

/// Default proximity threshold in screen pixels
pub const DEFAULT_PROXIMITY_PX: f64 = 40.0;

/// Default tile edge in pixels (standard slippy-map tiles)
pub const DEFAULT_TILE_SIZE: f64 = 256.0;

/// Default spiral radius in degrees of latitude (~55 m)
pub const DEFAULT_RADIUS_DEG: f64 = 0.0005;

/// Default delay between successive member reveals
pub const DEFAULT_STAGGER_MS: u64 = 40;

/// Tunables for clustering and spiderify
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    /// Maximum projected distance between a seed and an absorbed point, in pixels
    pub proximity_px: f64,
    /// Tile edge used by the projector to turn degrees into pixels
    pub tile_size: f64,
    /// Spiral radius `R`, in degrees
    pub radius_deg: f64,
    /// Stagger interval between member reveals
    pub stagger_ms: u64,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        SpiderConfig {
            proximity_px: DEFAULT_PROXIMITY_PX,
            tile_size: DEFAULT_TILE_SIZE,
            radius_deg: DEFAULT_RADIUS_DEG,
            stagger_ms: DEFAULT_STAGGER_MS,
        }
    }
}
