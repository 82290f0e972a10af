//! Map marker clustering with spiderified expansion
//!
//! Groups geo points into zoom-dependent clusters and, on request, spreads a
//! cluster's members on a ring around its centroid with a staggered reveal.

pub mod cluster;
pub mod config;
pub mod error;
pub mod spider;

pub use cluster::{Bounds, Cluster, ClusterId, Point, PointStore, Viewport, cluster};
pub use config::SpiderConfig;
pub use error::SpiderError;
pub use spider::{
    ClusterPhase, Clock, ManualClock, RenderInstruction, RevealHandle, RevealScheduler,
    SpiralLayout, SpiralPosition, Spiderifier, SystemClock,
};
