//! Hotspot classification and the edge cost transform used by searches.
//!
//! An edge is a hotspot when its current weight exceeds its base weight by at least the configured ratio.
//! When a query asks to avoid hotspots, their cost is multiplied by a penalty.
//! The penalty keeps costs finite so searches still find the least bad route when every route is congested.

use crate::datastr::{graph::*, graph_store::Snapshot};
use crate::error::{Error, Result};
use crate::io::alerts::Alert;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 1.5;
pub const DEFAULT_PENALTY: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CongestionModel {
    threshold: f64,
    penalty: f64,
}

impl Default for CongestionModel {
    fn default() -> Self {
        CongestionModel {
            threshold: DEFAULT_THRESHOLD,
            penalty: DEFAULT_PENALTY,
        }
    }
}

/// Edges classified as hotspots in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotspotSet {
    flags: Vec<bool>,
    edges: Vec<EdgeId>,
}

impl HotspotSet {
    pub fn contains(&self, edge: EdgeId) -> bool {
        self.flags.get(edge as usize).copied().unwrap_or(false)
    }

    /// Hotspot edges in ascending id order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// One line of the hotspot report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotEntry {
    pub edge: EdgeId,
    pub from: String,
    pub to: String,
    pub current_weight: Weight,
    pub base_weight: Weight,
    pub ratio: f64,
    /// An alert is registered for this edge.
    pub alerted: bool,
}

impl CongestionModel {
    pub fn new(threshold: f64, penalty: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!("hotspot threshold must be finite and positive, got {}", threshold)));
        }
        if !penalty.is_finite() || penalty < 1.0 {
            return Err(Error::InvalidConfig(format!("hotspot penalty must be finite and at least 1, got {}", penalty)));
        }
        Ok(CongestionModel { threshold, penalty })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Current weight relative to the base weight.
    /// An edge with zero base weight has an infinite ratio as soon as it carries any cost.
    pub fn ratio(&self, network: &RoadNetwork, snapshot: &Snapshot, edge: EdgeId) -> f64 {
        let current = snapshot.weight(edge);
        let base = network.base_weight(edge);
        if base > 0.0 {
            current / base
        } else if current > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    pub fn is_hotspot(&self, network: &RoadNetwork, snapshot: &Snapshot, edge: EdgeId) -> bool {
        self.ratio(network, snapshot, edge) >= self.threshold
    }

    pub fn classify(&self, network: &RoadNetwork, snapshot: &Snapshot) -> HotspotSet {
        let flags: Vec<bool> = (0..network.num_arcs() as EdgeId).map(|edge| self.is_hotspot(network, snapshot, edge)).collect();
        let edges = flags.iter().enumerate().filter(|&(_, &hot)| hot).map(|(edge, _)| edge as EdgeId).collect();
        HotspotSet { flags, edges }
    }

    /// Current weight scaled by the mode multiplier and, if requested, the hotspot penalty.
    /// Always finite.
    pub fn effective_cost(&self, network: &RoadNetwork, snapshot: &Snapshot, edge: EdgeId, mode: Mode, avoid_hotspots: bool) -> Weight {
        let mut cost = snapshot.weight(edge) * network.multiplier(edge, mode);
        if avoid_hotspots && self.is_hotspot(network, snapshot, edge) {
            cost *= self.penalty;
        }
        cost.min(f64::MAX)
    }

    pub fn hotspot_report(&self, network: &RoadNetwork, snapshot: &Snapshot, alerts: &[Alert]) -> Vec<HotspotEntry> {
        self.classify(network, snapshot)
            .edges()
            .iter()
            .map(|&edge| {
                let from = network.node_name(network.tail(edge)).to_string();
                let to = network.node_name(network.head(edge)).to_string();
                let alerted = alerts.iter().any(|alert| alert.matches(&from, &to));
                HotspotEntry {
                    edge,
                    current_weight: snapshot.weight(edge),
                    base_weight: network.base_weight(edge),
                    ratio: self.ratio(network, snapshot, edge),
                    from,
                    to,
                    alerted,
                }
            })
            .collect()
    }

    /// Registered alerts whose edge is currently a hotspot.
    pub fn triggered_alerts(&self, network: &RoadNetwork, snapshot: &Snapshot, alerts: &[Alert]) -> Vec<Alert> {
        alerts
            .iter()
            .filter(|alert| {
                match (network.node_id(&alert.from), network.node_id(&alert.to)) {
                    (Some(from), Some(to)) => network.edge_indices(from, to).any(|edge| self.is_hotspot(network, snapshot, edge)),
                    _ => false,
                }
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph_store::{GraphStore, WeightUpdate};

    fn store() -> GraphStore {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("B", "D", 8.0).unwrap();
        builder.add_edge("C", "D", 2.0).unwrap();
        builder.add_edge("D", "E", 0.0).unwrap();
        GraphStore::with_base_weights(builder.build())
    }

    fn set(store: &GraphStore, from: &str, to: &str, weight: Weight) {
        store.update_weights(&[WeightUpdate {
            from: from.to_string(),
            to: to.to_string(),
            weight,
        }]);
    }

    #[test]
    fn doubled_weight_is_a_hotspot() {
        let store = store();
        let model = CongestionModel::default();
        let bd = store.network().edge_by_name("B", "D").unwrap();
        assert!(model.classify(store.network(), &store.snapshot()).is_empty());

        set(&store, "B", "D", 16.0);
        let snapshot = store.snapshot();
        assert_eq!(model.ratio(store.network(), &snapshot, bd), 2.0);
        let hotspots = model.classify(store.network(), &snapshot);
        assert!(hotspots.contains(bd));
        assert_eq!(hotspots.edges(), &[bd]);
    }

    #[test]
    fn raising_weights_never_clears_a_hotspot() {
        let store = store();
        let model = CongestionModel::default();
        let cd = store.network().edge_by_name("C", "D").unwrap();

        let mut was_hotspot = false;
        for step in 0..20 {
            set(&store, "C", "D", 2.0 + step as f64 * 0.25);
            let is_hotspot = model.is_hotspot(store.network(), &store.snapshot(), cd);
            assert!(is_hotspot || !was_hotspot);
            was_hotspot = is_hotspot;
        }
        assert!(was_hotspot);
    }

    #[test]
    fn zero_base_weight() {
        let store = store();
        let model = CongestionModel::default();
        let de = store.network().edge_by_name("D", "E").unwrap();
        assert!(!model.is_hotspot(store.network(), &store.snapshot(), de));
        set(&store, "D", "E", 0.5);
        assert!(model.is_hotspot(store.network(), &store.snapshot(), de));
    }

    #[test]
    fn effective_cost_applies_mode_and_penalty() {
        let store = store();
        let model = CongestionModel::new(1.5, 10.0).unwrap();
        let network = store.network();
        let bd = network.edge_by_name("B", "D").unwrap();
        set(&store, "B", "D", 16.0);
        let snapshot = store.snapshot();

        assert_eq!(model.effective_cost(network, &snapshot, bd, Mode::Car, false), 16.0);
        assert_eq!(model.effective_cost(network, &snapshot, bd, Mode::Car, true), 160.0);
        assert_eq!(model.effective_cost(network, &snapshot, bd, Mode::Bike, false), 16.0 * ModeMultipliers::default().bike);

        let huge = CongestionModel::new(1.5, f64::MAX).unwrap();
        assert!(huge.effective_cost(network, &snapshot, bd, Mode::Bike, true).is_finite());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(CongestionModel::new(0.0, 10.0).is_err());
        assert!(CongestionModel::new(1.5, 0.5).is_err());
        assert!(CongestionModel::new(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn report_marks_alerted_hotspots() {
        let store = store();
        let model = CongestionModel::default();
        set(&store, "B", "D", 16.0);
        set(&store, "C", "D", 5.0);
        let alerts = vec![Alert::new("C", "D"), Alert::new("D", "E"), Alert::new("X", "Y")];

        let report = model.hotspot_report(store.network(), &store.snapshot(), &alerts);
        assert_eq!(report.len(), 2);
        let bd = report.iter().find(|e| e.from == "B").unwrap();
        assert!(!bd.alerted);
        assert_eq!(bd.ratio, 2.0);
        assert!(report.iter().find(|e| e.from == "C").unwrap().alerted);

        let triggered = model.triggered_alerts(store.network(), &store.snapshot(), &alerts);
        assert_eq!(triggered, vec![Alert::new("C", "D")]);
    }
}
