use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::layout::{SpiralLayout, SpiralPosition};
use super::scheduler::{Clock, RevealHandle, RevealScheduler};
use super::state::{ClusterPhase, ClusterStates};
use crate::cluster::{Cluster, ClusterId, Point, PointStore, Viewport, cluster_with_tile_size};
use crate::config::SpiderConfig;
use crate::error::SpiderError;

/// One marker the map collaborator should draw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderInstruction {
    /// Single-member cluster, drawn as the point itself
    Point {
        cluster_id: ClusterId,
        point_id: String,
        lat: f64,
        lng: f64,
    },
    /// Collapsed cluster marker at the centroid
    Cluster {
        cluster_id: ClusterId,
        lat: f64,
        lng: f64,
        count: usize,
    },
    /// Revealed member of an expanding or expanded cluster
    Member {
        cluster_id: ClusterId,
        point_id: String,
        lat: f64,
        lng: f64,
        index: usize,
    },
}

/// A cluster that is open or opening
///
/// Dropping it cancels the pending reveals through the handle.
struct Expansion {
    positions: Vec<SpiralPosition>,
    /// Members revealed so far; reveals fire in member order
    revealed: Rc<Cell<usize>>,
    handle: RevealHandle,
}

/// Clusters a point set and tracks which clusters are spiderified
///
/// Owns everything with a lifetime: the current pass, the phase table, and
/// the pending reveal timers. [`Spiderifier::dispose`] (also run on drop)
/// tears all of it down.
pub struct Spiderifier<P, C: Clock> {
    config: SpiderConfig,
    layout: SpiralLayout,
    scheduler: RevealScheduler<C>,
    clusters: Vec<Cluster<P>>,
    states: ClusterStates,
    expansions: HashMap<ClusterId, Expansion>,
}

impl<P: Clone, C: Clock> Spiderifier<P, C> {
    pub fn new(config: SpiderConfig, clock: C) -> Self {
        Spiderifier {
            layout: SpiralLayout::from_config(&config),
            config,
            scheduler: RevealScheduler::new(clock),
            clusters: Vec::new(),
            states: ClusterStates::new(),
            expansions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SpiderConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &RevealScheduler<C> {
        &self.scheduler
    }

    /// Clusters of the latest pass
    pub fn clusters(&self) -> &[Cluster<P>] {
        &self.clusters
    }

    /// Runs a clustering pass for a new viewport
    ///
    /// Clusters that keep their membership keep their phase; state and
    /// pending reveals of clusters that disappeared are dropped.
    pub fn recluster(&mut self, points: PointStore<P>, viewport: &Viewport) -> &[Cluster<P>] {
        let points = match &viewport.bounds {
            Some(bounds) => points.within(bounds),
            None => points,
        };

        let clusters = cluster_with_tile_size(
            &points,
            self.config.proximity_px,
            viewport.zoom,
            self.config.tile_size,
        );

        let present: HashSet<&ClusterId> = clusters
            .iter()
            .filter(|c| !c.is_singleton())
            .map(|c| &c.id)
            .collect();

        let before = self.expansions.len();
        self.expansions.retain(|id, _| present.contains(id));
        if self.expansions.len() != before {
            debug!(
                dropped = before - self.expansions.len(),
                "expanded clusters gone after reclustering"
            );
        }
        self.states.retain_ids(&present);
        for id in present {
            self.states.entry(id);
        }

        self.clusters = clusters;
        &self.clusters
    }

    /// Flips a cluster between collapsed and expanded
    ///
    /// Returns the phase the cluster is in afterwards. Collapsing is
    /// synchronous, so closing an open cluster lands in `Collapsed` directly.
    /// Single-member clusters are left alone.
    pub fn toggle(&mut self, id: &ClusterId) -> Result<ClusterPhase, SpiderError> {
        let cluster = self
            .clusters
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| SpiderError::UnknownCluster(id.clone()))?;

        if cluster.is_singleton() {
            trace!(cluster = %id, "toggle on single point ignored");
            return Ok(ClusterPhase::Collapsed);
        }

        let phase = self.states.entry(id);
        match phase.get() {
            ClusterPhase::Collapsed => {
                let positions = self.layout.layout(cluster)?;
                phase.apply(ClusterPhase::on_toggle)?;

                let revealed = Rc::new(Cell::new(0));
                let on_each = {
                    let revealed = revealed.clone();
                    move |pos: &SpiralPosition| {
                        trace!(point = %pos.point_id, "member revealed");
                        revealed.set(revealed.get() + 1);
                    }
                };
                let on_complete = {
                    let phase = phase.clone();
                    let id = id.clone();
                    move || match phase.apply(ClusterPhase::on_reveal_complete) {
                        Ok(_) => debug!(cluster = %id, "cluster expanded"),
                        Err(e) => warn!(cluster = %id, error = %e, "late reveal completion"),
                    }
                };

                let handle = self.scheduler.reveal(positions.clone(), on_each, on_complete);
                self.expansions.insert(
                    id.clone(),
                    Expansion {
                        positions,
                        revealed,
                        handle,
                    },
                );

                debug!(cluster = %id, members = cluster.count(), "cluster expanding");
                Ok(phase.get())
            }
            ClusterPhase::Expanding | ClusterPhase::Expanded => {
                phase.apply(ClusterPhase::on_toggle)?;
                if let Some(expansion) = self.expansions.remove(id) {
                    expansion.handle.cancel();
                }
                let next = phase.apply(ClusterPhase::on_cleanup_complete)?;
                debug!(cluster = %id, "cluster collapsed");
                Ok(next)
            }
            ClusterPhase::Collapsing => {
                debug!(cluster = %id, "toggle during collapse ignored");
                Ok(ClusterPhase::Collapsing)
            }
        }
    }

    /// Click handler of a cluster marker
    pub fn on_cluster_click(&mut self, id: &ClusterId) -> Result<ClusterPhase, SpiderError> {
        self.toggle(id)
    }

    /// Fires due reveals, returns the number of callbacks run
    pub fn tick(&mut self) -> usize {
        self.scheduler.run_due()
    }

    /// Phase of a cluster in the current pass
    pub fn phase(&self, id: &ClusterId) -> Option<ClusterPhase> {
        self.clusters
            .iter()
            .any(|c| &c.id == id)
            .then(|| self.states.phase(id))
    }

    /// Spiral positions of an open cluster
    pub fn positions(&self, id: &ClusterId) -> Option<&[SpiralPosition]> {
        self.expansions.get(id).map(|e| e.positions.as_slice())
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// What to draw for the current pass
    pub fn render_instructions(&self) -> Vec<RenderInstruction> {
        let mut out = Vec::with_capacity(self.clusters.len());

        for cluster in &self.clusters {
            if cluster.is_singleton() {
                let p = &cluster.members[0];
                out.push(RenderInstruction::Point {
                    cluster_id: cluster.id.clone(),
                    point_id: p.id.clone(),
                    lat: p.lat,
                    lng: p.lng,
                });
                continue;
            }

            match self.visible_members(cluster) {
                Some(positions) => {
                    out.extend(positions.iter().enumerate().map(|(index, pos)| {
                        RenderInstruction::Member {
                            cluster_id: cluster.id.clone(),
                            point_id: pos.point_id.clone(),
                            lat: pos.lat,
                            lng: pos.lng,
                            index,
                        }
                    }));
                }
                None => out.push(RenderInstruction::Cluster {
                    cluster_id: cluster.id.clone(),
                    lat: cluster.lat,
                    lng: cluster.lng,
                    count: cluster.count(),
                }),
            }
        }

        out
    }

    /// Calls `render_marker(point, index)` for every point-level marker
    ///
    /// Single points get index 0 at their own coordinates. Revealed members
    /// are handed over at their spiral position, with the same index as in
    /// [`Spiderifier::render_instructions`]. Collapsed cluster markers are not
    /// points and only appear there.
    pub fn render<F>(&self, mut render_marker: F)
    where
        F: FnMut(&Point<P>, usize),
    {
        for cluster in &self.clusters {
            if cluster.is_singleton() {
                render_marker(&cluster.members[0], 0);
                continue;
            }
            let Some(positions) = self.visible_members(cluster) else {
                continue;
            };

            // Member order may differ from the pass that laid the spiral out
            let by_id: HashMap<&str, &Point<P>> = cluster
                .members
                .iter()
                .map(|m| (m.id.as_str(), m))
                .collect();

            for (index, pos) in positions.iter().enumerate() {
                let Some(member) = by_id.get(pos.point_id.as_str()) else {
                    warn!(cluster = %cluster.id, point = %pos.point_id, "spiral member missing");
                    continue;
                };
                let placed = Point {
                    lat: pos.lat,
                    lng: pos.lng,
                    ..(*member).clone()
                };
                render_marker(&placed, index);
            }
        }
    }

    /// Revealed positions of an open cluster, `None` when collapsed
    fn visible_members(&self, cluster: &Cluster<P>) -> Option<&[SpiralPosition]> {
        if !self.states.phase(&cluster.id).is_open() {
            return None;
        }
        let expansion = self.expansions.get(&cluster.id)?;
        let shown = expansion.revealed.get().min(expansion.positions.len());
        Some(&expansion.positions[..shown])
    }

    /// Forgets all state, for when the point set itself is replaced
    pub fn reset(&mut self) {
        self.dispose();
    }

    /// Cancels every pending reveal and clears all cluster state
    pub fn dispose(&mut self) {
        if !self.expansions.is_empty() {
            debug!(open = self.expansions.len(), "disposing open clusters");
        }
        for (_, expansion) in self.expansions.drain() {
            expansion.handle.cancel();
        }
        self.states.clear();
        self.clusters.clear();
    }
}

impl<P, C: Clock> Drop for Spiderifier<P, C> {
    fn drop(&mut self) {
        for (_, expansion) in self.expansions.drain() {
            expansion.handle.cancel();
        }
    }
}
