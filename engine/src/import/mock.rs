//! Deterministic traffic data for a small part of Berlin.

use super::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockSource;

// (from, to, current weight, free flow weight, from position, to position)
const SEGMENTS: [(&str, &str, Weight, Weight, (f64, f64), (f64, f64)); 10] = [
    ("A", "B", 5.0, 4.0, (52.5200, 13.4050), (52.5205, 13.4060)),
    ("B", "C", 3.0, 3.0, (52.5205, 13.4060), (52.5210, 13.4070)),
    ("A", "C", 10.0, 6.0, (52.5200, 13.4050), (52.5210, 13.4070)),
    ("B", "D", 8.0, 4.0, (52.5205, 13.4060), (52.5215, 13.4080)),
    ("C", "D", 2.0, 2.0, (52.5210, 13.4070), (52.5215, 13.4080)),
    ("D", "E", 4.0, 4.0, (52.5215, 13.4080), (52.5220, 13.4090)),
    ("E", "F", 6.0, 5.0, (52.5220, 13.4090), (52.5225, 13.4100)),
    ("C", "F", 12.0, 6.0, (52.5210, 13.4070), (52.5225, 13.4100)),
    ("A", "E", 15.0, 9.0, (52.5200, 13.4050), (52.5220, 13.4090)),
    ("B", "E", 7.0, 6.0, (52.5205, 13.4060), (52.5220, 13.4090)),
];

impl MockSource {
    pub fn segments(&self) -> Vec<Segment> {
        SEGMENTS
            .iter()
            .map(|&(from, to, weight, free_flow, (from_lat, from_lon), (to_lat, to_lon))| Segment {
                from: from.to_string(),
                to: to.to_string(),
                weight,
                free_flow: Some(free_flow),
                from_pos: Some(Coordinates::new(from_lat, from_lon)),
                to_pos: Some(Coordinates::new(to_lat, to_lon)),
            })
            .collect()
    }
}

impl TrafficSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, _area: &Area) -> Result<Vec<Segment>> {
        Ok(self.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::congestion::CongestionModel;

    #[test]
    fn mock_data_contains_hotspots_under_default_model() {
        let store = build_network(&MockSource.segments(), ModeMultipliers::default()).unwrap();
        let network = store.network();
        let hotspots = CongestionModel::default().classify(network, &store.snapshot());
        let mut labels: Vec<String> = hotspots.edges().iter().map(|&edge| network.edge_label(edge)).collect();
        labels.sort();
        assert_eq!(labels, vec!["A->C", "A->E", "B->D", "C->F"]);
    }
}
