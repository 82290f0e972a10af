use thiserror::Error;

use crate::cluster::ClusterId;
use crate::spider::ClusterPhase;

/// Errors returned by the spiderify API
///
/// Clustering itself never fails: empty and singleton inputs are valid and
/// have defined output. Only operations addressed at a specific cluster can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpiderError {
    /// The id does not name a cluster of the current pass
    #[error("unknown cluster id: {0}")]
    UnknownCluster(ClusterId),

    /// A single-point cluster has no spiral layout
    #[error("cluster {0} has a single member and cannot be spiderified")]
    SingletonCluster(ClusterId),

    /// The requested event is not valid in the current phase
    #[error("invalid transition: {event} while {phase:?}")]
    InvalidTransition {
        phase: ClusterPhase,
        event: &'static str,
    },
}
