//! Expand/collapse lifecycle of multi-member clusters

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;
use crate::error::SpiderError;

/// collapsed -> expanding -> expanded -> collapsing -> collapsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPhase {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

impl ClusterPhase {
    /// User asked to flip the cluster
    pub fn on_toggle(self) -> Result<ClusterPhase, SpiderError> {
        match self {
            ClusterPhase::Collapsed => Ok(ClusterPhase::Expanding),
            ClusterPhase::Expanding | ClusterPhase::Expanded => Ok(ClusterPhase::Collapsing),
            ClusterPhase::Collapsing => Err(self.invalid("toggle")),
        }
    }

    /// The last staggered reveal fired
    pub fn on_reveal_complete(self) -> Result<ClusterPhase, SpiderError> {
        match self {
            ClusterPhase::Expanding => Ok(ClusterPhase::Expanded),
            _ => Err(self.invalid("reveal complete")),
        }
    }

    /// Pending reveals are cancelled and member markers removed
    pub fn on_cleanup_complete(self) -> Result<ClusterPhase, SpiderError> {
        match self {
            ClusterPhase::Collapsing => Ok(ClusterPhase::Collapsed),
            _ => Err(self.invalid("cleanup complete")),
        }
    }

    /// Members are (being) drawn instead of the cluster marker
    pub fn is_open(self) -> bool {
        matches!(self, ClusterPhase::Expanding | ClusterPhase::Expanded)
    }

    fn invalid(self, event: &'static str) -> SpiderError {
        SpiderError::InvalidTransition { phase: self, event }
    }
}

/// Phase of one cluster, shared with the reveal completion callback
#[derive(Debug, Clone, Default)]
pub struct SharedPhase(Rc<Cell<ClusterPhase>>);

impl SharedPhase {
    pub fn get(&self) -> ClusterPhase {
        self.0.get()
    }

    /// Applies a transition, leaving the phase untouched on error
    pub fn apply(
        &self,
        transition: fn(ClusterPhase) -> Result<ClusterPhase, SpiderError>,
    ) -> Result<ClusterPhase, SpiderError> {
        let next = transition(self.0.get())?;
        self.0.set(next);
        Ok(next)
    }
}

/// Phase table keyed by cluster id
///
/// Only multi-member clusters have entries; a missing entry reads as collapsed.
#[derive(Debug, Default)]
pub struct ClusterStates {
    phases: HashMap<ClusterId, SharedPhase>,
}

impl ClusterStates {
    pub fn new() -> Self {
        ClusterStates::default()
    }

    pub fn phase(&self, id: &ClusterId) -> ClusterPhase {
        self.phases.get(id).map(SharedPhase::get).unwrap_or_default()
    }

    /// Entry for `id`, created collapsed on first sight
    pub fn entry(&mut self, id: &ClusterId) -> SharedPhase {
        self.phases.entry(id.clone()).or_default().clone()
    }

    /// Drops entries whose cluster is gone from the current pass
    pub fn retain_ids(&mut self, present: &HashSet<&ClusterId>) {
        self.phases.retain(|id, _| present.contains(id));
    }

    pub fn clear(&mut self) {
        self.phases.clear();
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
