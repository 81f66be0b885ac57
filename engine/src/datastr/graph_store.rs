//! Shared owner of the road network and its live edge weights.
//!
//! Weights are kept in an immutable buffer behind a reader-writer lock.
//! Taking a snapshot only clones the `Arc` under the read lock, so it is cheap and never blocks on I/O.
//! An update builds a complete new buffer outside of the lock and swaps it in under the write lock.
//! Readers therefore either see all of a batch or none of it.

use super::graph::*;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Immutable point-in-time copy of all current edge weights.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: u64,
    weights: Arc<[Weight]>,
}

impl Snapshot {
    /// Number of update batches applied before this snapshot was published.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn weight(&self, edge: EdgeId) -> Weight {
        self.weights[edge as usize]
    }

    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }
}

/// New current weight for the edges between two named nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightUpdate {
    pub from: String,
    pub to: String,
    pub weight: Weight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    pub applied: usize,
    pub ignored: usize,
    pub version: u64,
}

#[derive(Debug)]
pub struct GraphStore {
    network: Arc<RoadNetwork>,
    current: RwLock<Snapshot>,
    // serializes writers, so no batch is lost between reading the old buffer and publishing the new one
    writer: Mutex<()>,
}

fn valid_weight(weight: Weight) -> bool {
    weight.is_finite() && weight >= 0.0
}

impl GraphStore {
    /// Create a store with the given initial current weights, one per edge.
    pub fn new(network: RoadNetwork, weights: Vec<Weight>) -> Result<Self> {
        if weights.len() != network.num_arcs() {
            return Err(Error::InvalidConfig(format!(
                "expected {} initial weights, got {}",
                network.num_arcs(),
                weights.len()
            )));
        }
        if let Some(edge) = weights.iter().position(|&w| !valid_weight(w)) {
            let edge = edge as EdgeId;
            return Err(Error::InvalidWeight {
                from: network.node_name(network.tail(edge)).to_string(),
                to: network.node_name(network.head(edge)).to_string(),
                weight: weights[edge as usize],
            });
        }

        Ok(GraphStore {
            network: Arc::new(network),
            current: RwLock::new(Snapshot {
                version: 0,
                weights: weights.into(),
            }),
            writer: Mutex::new(()),
        })
    }

    /// Create a store where every edge starts at its base weight.
    pub fn with_base_weights(network: RoadNetwork) -> Self {
        let weights: Arc<[Weight]> = network.base_weights().into();
        GraphStore {
            network: Arc::new(network),
            current: RwLock::new(Snapshot { version: 0, weights }),
            writer: Mutex::new(()),
        }
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    /// Consistent copy of all current weights.
    pub fn snapshot(&self) -> Snapshot {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the current weight of all edges between each pair of named nodes.
    /// Unknown edges and invalid weights are skipped and logged.
    pub fn update_weights(&self, updates: &[WeightUpdate]) -> UpdateSummary {
        let network = &self.network;
        let mut resolved = Vec::with_capacity(updates.len());
        let mut ignored = 0;

        for update in updates {
            let edges: Vec<EdgeId> = match (network.node_id(&update.from), network.node_id(&update.to)) {
                (Some(from), Some(to)) => network.edge_indices(from, to).collect(),
                _ => Vec::new(),
            };
            if edges.is_empty() {
                warn!(from = %update.from, to = %update.to, "ignoring weight update for unknown edge");
                ignored += 1;
                continue;
            }
            if !valid_weight(update.weight) {
                warn!(from = %update.from, to = %update.to, weight = update.weight, "ignoring invalid weight");
                ignored += 1;
                continue;
            }
            resolved.extend(edges.into_iter().map(|edge| (edge, update.weight)));
        }

        let version = self.publish(&resolved);
        UpdateSummary {
            applied: updates.len() - ignored,
            ignored,
            version,
        }
    }

    /// Same as `update_weights` for callers which already know the edge ids.
    pub fn update_edge_weights(&self, updates: &[(EdgeId, Weight)]) -> UpdateSummary {
        let num_arcs = self.network.num_arcs();
        let (valid, invalid): (Vec<(EdgeId, Weight)>, Vec<(EdgeId, Weight)>) =
            updates.iter().copied().partition(|&(edge, weight)| (edge as usize) < num_arcs && valid_weight(weight));

        for (edge, weight) in &invalid {
            warn!(edge, weight, "ignoring weight update");
        }

        let version = self.publish(&valid);
        UpdateSummary {
            applied: valid.len(),
            ignored: invalid.len(),
            version,
        }
    }

    fn publish(&self, updates: &[(EdgeId, Weight)]) -> u64 {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let old = self.snapshot();
        let mut weights = old.weights.to_vec();
        for &(edge, weight) in updates {
            weights[edge as usize] = weight;
        }

        let next = Snapshot {
            version: old.version + 1,
            weights: weights.into(),
        };
        let version = next.version;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;

        debug!(version, edges = updates.len(), "published new weights");
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn store() -> GraphStore {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("A", "B", 2.0).unwrap();
        builder.add_edge("B", "C", 3.0).unwrap();
        builder.add_edge("A", "C", 10.0).unwrap();
        GraphStore::with_base_weights(builder.build())
    }

    fn update(from: &str, to: &str, weight: Weight) -> WeightUpdate {
        WeightUpdate {
            from: from.to_string(),
            to: to.to_string(),
            weight,
        }
    }

    #[test]
    fn snapshot_is_idempotent_without_updates() {
        let store = store();
        let a = store.snapshot();
        let b = store.snapshot();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn snapshots_are_not_affected_by_later_updates() {
        let store = store();
        let before = store.snapshot();
        let summary = store.update_weights(&[update("A", "C", 4.0)]);
        assert_eq!(summary, UpdateSummary { applied: 1, ignored: 0, version: 1 });

        let ac = store.network().edge_by_name("A", "C").unwrap();
        assert_eq!(before.weight(ac), 10.0);
        assert_eq!(store.snapshot().weight(ac), 4.0);
        assert_eq!(store.network().base_weight(ac), 10.0);
    }

    #[test]
    fn unknown_edges_and_invalid_weights_are_ignored() {
        let store = store();
        let summary = store.update_weights(&[update("C", "A", 1.0), update("X", "Y", 1.0), update("A", "B", -3.0), update("B", "C", f64::NAN), update("A", "B", 7.0)]);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.ignored, 4);

        let ab = store.network().edge_by_name("A", "B").unwrap();
        assert_eq!(store.snapshot().weight(ab), 7.0);

        let summary = store.update_edge_weights(&[(99, 1.0), (ab, 1.5)]);
        assert_eq!((summary.applied, summary.ignored), (1, 1));
        assert_eq!(store.snapshot().weight(ab), 1.5);
    }

    #[test]
    fn initial_weights_are_validated() {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("A", "B", 2.0).unwrap();
        assert!(GraphStore::new(builder.clone().build(), vec![]).is_err());
        assert!(matches!(GraphStore::new(builder.build(), vec![-1.0]), Err(Error::InvalidWeight { .. })));
    }

    #[test]
    fn readers_never_see_partial_batches() {
        let mut builder = NetworkBuilder::default();
        for i in 0..200 {
            builder.add_edge(&format!("n{}", i), &format!("n{}", i + 1), 1.0).unwrap();
        }
        let store = GraphStore::with_base_weights(builder.build());
        let edges: Vec<EdgeId> = (0..store.network().num_arcs() as EdgeId).collect();

        thread::scope(|s| {
            s.spawn(|| {
                for round in 0..200 {
                    let weight = (round % 2 + 1) as Weight;
                    let batch: Vec<(EdgeId, Weight)> = edges.iter().map(|&e| (e, weight)).collect();
                    store.update_edge_weights(&batch);
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = store.snapshot();
                        let first = snapshot.weight(0);
                        assert!(snapshot.weights().iter().all(|&w| w == first));
                    }
                });
            }
        });

        assert_eq!(store.snapshot().version(), 200);
    }
}
