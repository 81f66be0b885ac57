//! Recorded weight snapshots and per-edge averages over them.

use super::{load_json, store_json};
use crate::datastr::{
    graph::{EdgeId, Graph, RoadNetwork, Weight},
    graph_store::Snapshot,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub weight: Weight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub weights: Vec<EdgeRecord>,
}

impl HistoricalSnapshot {
    /// Copy all current weights of `snapshot` together with the edge names.
    pub fn capture(network: &RoadNetwork, snapshot: &Snapshot, recorded_at: DateTime<Utc>) -> Self {
        let weights = (0..network.num_arcs() as EdgeId)
            .map(|edge| EdgeRecord {
                from: network.node_name(network.tail(edge)).to_string(),
                to: network.node_name(network.head(edge)).to_string(),
                weight: snapshot.weight(edge),
            })
            .collect();
        HistoricalSnapshot { recorded_at, weights }
    }
}

/// Average weight per `from->to` key over all snapshots which contain the edge.
pub fn average_per_edge(snapshots: &[HistoricalSnapshot]) -> BTreeMap<String, Weight> {
    let mut sums: BTreeMap<String, (Weight, usize)> = BTreeMap::new();
    for snapshot in snapshots {
        for record in &snapshot.weights {
            let entry = sums.entry(format!("{}->{}", record.from, record.to)).or_insert((0.0, 0));
            entry.0 += record.weight;
            entry.1 += 1;
        }
    }
    sums.into_iter().map(|(key, (sum, count))| (key, sum / count as Weight)).collect()
}

pub trait HistoricalLog {
    fn record(&mut self, snapshot: HistoricalSnapshot) -> Result<()>;
    fn snapshots(&self) -> Result<Vec<HistoricalSnapshot>>;

    fn report(&self) -> Result<BTreeMap<String, Weight>> {
        Ok(average_per_edge(&self.snapshots()?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    snapshots: Vec<HistoricalSnapshot>,
}

impl HistoricalLog for MemoryHistory {
    fn record(&mut self, snapshot: HistoricalSnapshot) -> Result<()> {
        self.snapshots.push(snapshot);
        Ok(())
    }

    fn snapshots(&self) -> Result<Vec<HistoricalSnapshot>> {
        Ok(self.snapshots.clone())
    }
}

/// Snapshots stored as one JSON array, appended to on every `record`.
#[derive(Debug, Clone)]
pub struct JsonHistoryFile {
    path: PathBuf,
}

impl JsonHistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonHistoryFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoricalLog for JsonHistoryFile {
    fn record(&mut self, snapshot: HistoricalSnapshot) -> Result<()> {
        let mut all: Vec<HistoricalSnapshot> = load_json(&self.path)?;
        all.push(snapshot);
        store_json(&self.path, &all)
    }

    fn snapshots(&self) -> Result<Vec<HistoricalSnapshot>> {
        load_json(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::{
        graph::NetworkBuilder,
        graph_store::{GraphStore, WeightUpdate},
    };
    use chrono::TimeZone;

    fn store() -> GraphStore {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("A", "B", 5.0).unwrap();
        builder.add_edge("B", "C", 3.0).unwrap();
        GraphStore::with_base_weights(builder.build())
    }

    fn record_two(log: &mut dyn HistoricalLog) {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        log.record(HistoricalSnapshot::capture(store.network(), &store.snapshot(), t0)).unwrap();
        store.update_weights(&[WeightUpdate {
            from: "A".to_string(),
            to: "B".to_string(),
            weight: 9.0,
        }]);
        log.record(HistoricalSnapshot::capture(store.network(), &store.snapshot(), t0 + chrono::Duration::minutes(5)))
            .unwrap();
    }

    #[test]
    fn averages_over_recorded_snapshots() {
        let mut log = MemoryHistory::default();
        assert!(log.report().unwrap().is_empty());
        record_two(&mut log);

        let report = log.report().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report["A->B"], 7.0);
        assert_eq!(report["B->C"], 3.0);
    }

    #[test]
    fn edges_missing_from_some_snapshots_average_over_their_own_count() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let record = |from: &str, weight| EdgeRecord {
            from: from.to_string(),
            to: "X".to_string(),
            weight,
        };
        let snapshots = vec![
            HistoricalSnapshot {
                recorded_at: t,
                weights: vec![record("A", 2.0), record("B", 10.0)],
            },
            HistoricalSnapshot {
                recorded_at: t,
                weights: vec![record("A", 4.0)],
            },
        ];
        let report = average_per_edge(&snapshots);
        assert_eq!(report["A->X"], 3.0);
        assert_eq!(report["B->X"], 10.0);
    }

    #[test]
    fn json_history_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("traffic.json");
        let mut log = JsonHistoryFile::new(&path);
        assert!(log.snapshots().unwrap().is_empty());
        record_two(&mut log);

        let reopened = JsonHistoryFile::new(&path);
        let snapshots = reopened.snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].recorded_at < snapshots[1].recorded_at);
        assert_eq!(reopened.report().unwrap()["A->B"], 7.0);
    }
}
