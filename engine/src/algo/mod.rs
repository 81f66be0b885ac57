//! Traffic-aware route planning on weight snapshots.

use crate::datastr::{graph::*, graph_store::Snapshot};
use crate::error::SearchError;
use std::{fmt, str::FromStr, time::Duration};

pub mod a_star;
pub mod comparison;
pub mod congestion;
pub mod dijkstra;

use self::congestion::CongestionModel;

/// A source-target pair together with the travel preferences of the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Query {
    pub from: NodeId,
    pub to: NodeId,
    pub mode: Mode,
    pub avoid_hotspots: bool,
}

impl Query {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Query {
            from,
            to,
            mode: Mode::Car,
            avoid_hotspots: false,
        }
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Query { mode, ..self }
    }

    pub fn avoiding_hotspots(self, avoid_hotspots: bool) -> Self {
        Query { avoid_hotspots, ..self }
    }
}

/// Everything a search reads: the topology, one weight snapshot and the congestion rules.
/// All of it is immutable, so a context can be shared between threads.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub network: &'a RoadNetwork,
    pub snapshot: &'a Snapshot,
    pub congestion: &'a CongestionModel,
    pub timeout: Option<Duration>,
}

impl<'a> SearchContext<'a> {
    pub fn new(network: &'a RoadNetwork, snapshot: &'a Snapshot, congestion: &'a CongestionModel) -> Self {
        SearchContext {
            network,
            snapshot,
            congestion,
            timeout: None,
        }
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        SearchContext { timeout, ..self }
    }

    /// Cost of traversing `edge` for the given query.
    pub fn edge_cost(&self, edge: EdgeId, query: &Query) -> Weight {
        self.congestion
            .effective_cost(self.network, self.snapshot, edge, query.mode, query.avoid_hotspots)
    }
}

/// A found route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    /// Sum of the effective costs of all edges.
    pub cost: Weight,
    /// Traversed edges which were hotspots in the snapshot used for the search.
    pub hotspots: Vec<EdgeId>,
    pub settled_nodes: usize,
    pub snapshot_version: u64,
}

impl Route {
    pub fn node_names<'n>(&self, network: &'n RoadNetwork) -> Vec<&'n str> {
        self.nodes.iter().map(|&node| network.node_name(node)).collect()
    }

    /// `A -> B -> C`
    pub fn describe(&self, network: &RoadNetwork) -> String {
        self.node_names(network).join(" -> ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Dijkstra,
    AStar,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::AStar => "astar",
        }
    }

    /// Run the algorithm, A* with the geographic potential.
    pub fn run(self, ctx: &SearchContext, query: &Query) -> Result<Route, SearchError> {
        match self {
            Algorithm::Dijkstra => dijkstra::dijkstra(ctx, query),
            Algorithm::AStar => a_star::astar(ctx, query, &mut a_star::GeoPotential::default()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(Algorithm::Dijkstra),
            "astar" | "a*" | "a_star" => Ok(Algorithm::AStar),
            _ => Err(format!("unknown algorithm {:?}, expected dijkstra or astar", s)),
        }
    }
}
