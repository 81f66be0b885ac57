//! Traffic data sources and building the road network from their segments.
//!
//! A source delivers road segments with their current congestion weight for an area.
//! The first fetch defines the topology, later fetches only update weights.

use crate::datastr::{
    graph::{Coordinates, Graph, ModeMultipliers, NetworkBuilder, NodeId, Weight},
    graph_store::{GraphStore, WeightUpdate},
};
use crate::error::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub mod here;
pub mod mock;

pub use self::mock::MockSource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Smallest box containing both positions.
    pub fn around(a: Coordinates, b: Coordinates) -> Self {
        BoundingBox {
            min_lat: a.lat.min(b.lat),
            min_lon: a.lon.min(b.lon),
            max_lat: a.lat.max(b.lat),
            max_lon: a.lon.max(b.lon),
        }
    }
}

/// A city, optionally narrowed down to a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub city: String,
    pub bbox: Option<BoundingBox>,
}

impl Area {
    pub fn city(city: &str) -> Self {
        Area {
            city: city.to_string(),
            bbox: None,
        }
    }

    pub fn bbox(city: &str, bbox: BoundingBox) -> Self {
        Area {
            city: city.to_string(),
            bbox: Some(bbox),
        }
    }
}

/// A directed road segment with its current weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub weight: Weight,
    /// Cost without congestion, if the source knows it. Otherwise the first observed weight is the baseline.
    #[serde(default)]
    pub free_flow: Option<Weight>,
    #[serde(default)]
    pub from_pos: Option<Coordinates>,
    #[serde(default)]
    pub to_pos: Option<Coordinates>,
}

impl Segment {
    pub fn to_update(&self) -> WeightUpdate {
        WeightUpdate {
            from: self.from.clone(),
            to: self.to.clone(),
            weight: self.weight,
        }
    }
}

pub trait TrafficSource: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, area: &Area) -> Result<Vec<Segment>>;
}

/// Serves mock data whenever the wrapped source fails or returns nothing.
#[derive(Debug, Clone)]
pub struct WithMockFallback<S> {
    inner: S,
    mock: MockSource,
}

impl<S: TrafficSource> WithMockFallback<S> {
    pub fn new(inner: S) -> Self {
        WithMockFallback { inner, mock: MockSource }
    }
}

impl<S: TrafficSource> TrafficSource for WithMockFallback<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, area: &Area) -> Result<Vec<Segment>> {
        match self.inner.fetch(area) {
            Ok(segments) if !segments.is_empty() => Ok(segments),
            Ok(_) => {
                warn!(source = self.inner.name(), city = %area.city, "source returned no segments, falling back to mock data");
                self.mock.fetch(area)
            }
            Err(e) => {
                warn!(source = self.inner.name(), city = %area.city, error = %e, "falling back to mock data");
                self.mock.fetch(area)
            }
        }
    }
}

/// Fetch all areas concurrently. One result per area, in order.
pub fn fetch_each(source: &dyn TrafficSource, areas: &[Area]) -> Vec<Result<Vec<Segment>>> {
    areas.par_iter().map(|area| source.fetch(area)).collect()
}

/// Fetch all areas concurrently; areas whose fetch fails get mock data instead.
pub fn fetch_multiple(source: &dyn TrafficSource, areas: &[Area]) -> Vec<Vec<Segment>> {
    let mock = MockSource;
    fetch_each(source, areas)
        .into_iter()
        .zip(areas)
        .map(|(result, area)| match result {
            Ok(segments) => segments,
            Err(e) => {
                warn!(source = source.name(), city = %area.city, error = %e, "area fetch failed, using mock data");
                mock.segments()
            }
        })
        .collect()
}

/// Build the road network from the segments of an initial fetch.
/// The baseline of each edge is its free flow cost if known, its current weight otherwise.
pub fn build_network(segments: &[Segment], multipliers: ModeMultipliers) -> Result<GraphStore> {
    if segments.is_empty() {
        return Err(Error::DataSourceUnavailable("no road segments to build a network from".to_string()));
    }

    let mut builder = NetworkBuilder::new(multipliers);
    for segment in segments {
        builder.add_node(&segment.from, segment.from_pos)?;
        builder.add_node(&segment.to, segment.to_pos)?;
        builder.add_edge(&segment.from, &segment.to, segment.free_flow.unwrap_or(segment.weight))?;
    }
    let network = builder.build();

    // edges are stored grouped by tail, in insertion order within each group
    let mut weights = vec![0.0; segments.len()];
    let mut next_slot: Vec<u32> = (0..network.num_nodes() as NodeId).map(|node| network.neighbor_edge_indices(node).start).collect();
    for segment in segments {
        let tail = network.resolve(&segment.from)?;
        let slot = &mut next_slot[tail as usize];
        weights[*slot as usize] = segment.weight;
        *slot += 1;
    }

    GraphStore::new(network, weights)
}

/// Weight updates for a store built from an earlier fetch.
pub fn weight_updates(segments: &[Segment]) -> Vec<WeightUpdate> {
    segments.iter().map(Segment::to_update).collect()
}
