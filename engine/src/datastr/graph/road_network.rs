//! Static road network in adjacency array representation.
//!
//! Nodes and edges are identified by dense ids from `0` to `n-1` and `m-1` respectively.
//! `first_out` has `n+1` elements, the first one is always 0 and the last one `m`.
//! `head[first_out[x]..first_out[x+1]]` contains all neighbors of `x`.
//! Per edge we additionally keep the tail, the immutable base weight and the mode multipliers.
//! Current weights are not part of this struct, see `GraphStore`.

use super::*;
use crate::error::{Error, Result};
use std::{collections::HashMap, ops::Range};

#[derive(Debug, Clone)]
pub struct RoadNetwork {
    // index of first edge of each node +1 entry in the end
    first_out: Vec<EdgeId>,
    // the node ids to which each edge points
    head: Vec<NodeId>,
    // the node ids from which each edge starts
    tail: Vec<NodeId>,
    // free flow cost of each edge
    base_weight: Vec<Weight>,
    multipliers: Vec<ModeMultipliers>,

    names: Vec<String>,
    coords: Vec<Option<Coordinates>>,
    ids: HashMap<String, NodeId>,
}

impl Graph for RoadNetwork {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.head.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        let range = self.neighbor_edge_indices_usize(node);
        range.end - range.start
    }
}

impl RoadNetwork {
    /// Look up the dense id of a node by its name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Like `node_id` but with an error naming the unknown node.
    pub fn resolve(&self, name: &str) -> Result<NodeId> {
        self.node_id(name).ok_or_else(|| Error::InvalidNode(name.to_string()))
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.names[node as usize]
    }

    pub fn coords(&self, node: NodeId) -> Option<Coordinates> {
        self.coords[node as usize]
    }

    /// Geographic heuristics only work when every node has a position.
    pub fn has_all_coords(&self) -> bool {
        self.coords.iter().all(Option::is_some)
    }

    pub fn neighbor_edge_indices(&self, node: NodeId) -> Range<EdgeId> {
        self.first_out[node as usize]..self.first_out[node as usize + 1]
    }

    pub fn neighbor_edge_indices_usize(&self, node: NodeId) -> Range<usize> {
        let range = self.neighbor_edge_indices(node);
        range.start as usize..range.end as usize
    }

    /// Iterate over the outgoing links of `node` in insertion order.
    pub fn neighbor_iter(&self, node: NodeId) -> impl Iterator<Item = Link> + '_ {
        self.neighbor_edge_indices(node).map(move |edge| Link {
            edge,
            node: self.head[edge as usize],
        })
    }

    pub fn head(&self, edge: EdgeId) -> NodeId {
        self.head[edge as usize]
    }

    pub fn tail(&self, edge: EdgeId) -> NodeId {
        self.tail[edge as usize]
    }

    pub fn base_weight(&self, edge: EdgeId) -> Weight {
        self.base_weight[edge as usize]
    }

    pub fn base_weights(&self) -> &[Weight] {
        &self.base_weight
    }

    pub fn multiplier(&self, edge: EdgeId, mode: Mode) -> f64 {
        self.multipliers[edge as usize].get(mode)
    }

    /// All edges from `from` to `to`. There may be more than one.
    pub fn edge_indices(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.neighbor_iter(from).filter(move |link| link.node == to).map(|link| link.edge)
    }

    /// Find the first edge between two named nodes.
    pub fn edge_by_name(&self, from: &str, to: &str) -> Option<EdgeId> {
        let from = self.node_id(from)?;
        let to = self.node_id(to)?;
        self.edge_indices(from, to).next()
    }

    /// Human readable `from->to` label, also used as key in historical reports.
    pub fn edge_label(&self, edge: EdgeId) -> String {
        format!("{}->{}", self.node_name(self.tail(edge)), self.node_name(self.head(edge)))
    }

    /// The node closest to the given position, `None` if no node has coordinates.
    pub fn closest_node(&self, position: Coordinates) -> Option<NodeId> {
        self.coords
            .iter()
            .enumerate()
            .filter_map(|(node, coords)| coords.map(|c| (node as NodeId, c.distance_to(&position))))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(node, _)| node)
    }
}

/// Incrementally collects nodes and edges and builds the adjacency arrays.
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    default_multipliers: ModeMultipliers,
    names: Vec<String>,
    coords: Vec<Option<Coordinates>>,
    ids: HashMap<String, NodeId>,
    edges: Vec<(NodeId, NodeId, Weight, ModeMultipliers)>,
}

impl NetworkBuilder {
    pub fn new(default_multipliers: ModeMultipliers) -> Self {
        NetworkBuilder {
            default_multipliers,
            ..Default::default()
        }
    }

    /// Add a node if it does not exist yet and return its id.
    /// Coordinates are only taken from the first call which provides them.
    pub fn add_node(&mut self, name: &str, coords: Option<Coordinates>) -> Result<NodeId> {
        if let Some(c) = coords {
            if !c.is_valid() {
                return Err(Error::InvalidCoordinates(format!("{} for node {}", c, name)));
            }
        }

        if let Some(&id) = self.ids.get(name) {
            if self.coords[id as usize].is_none() {
                self.coords[id as usize] = coords;
            }
            return Ok(id);
        }

        let id = self.names.len() as NodeId;
        self.names.push(name.to_string());
        self.coords.push(coords);
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Add a directed edge with the default multipliers. Missing endpoints are created.
    pub fn add_edge(&mut self, from: &str, to: &str, base_weight: Weight) -> Result<&mut Self> {
        let multipliers = self.default_multipliers;
        self.add_edge_with_multipliers(from, to, base_weight, multipliers)
    }

    pub fn add_edge_with_multipliers(&mut self, from: &str, to: &str, base_weight: Weight, multipliers: ModeMultipliers) -> Result<&mut Self> {
        if !base_weight.is_finite() || base_weight < 0.0 {
            return Err(Error::InvalidWeight {
                from: from.to_string(),
                to: to.to_string(),
                weight: base_weight,
            });
        }
        multipliers.validate().map_err(Error::InvalidConfig)?;

        let tail = self.add_node(from, None)?;
        let head = self.add_node(to, None)?;
        self.edges.push((tail, head, base_weight, multipliers));
        Ok(self)
    }

    pub fn build(self) -> RoadNetwork {
        let n = self.names.len();

        // stable sort keeps the insertion order of the links of each node
        let mut edges = self.edges;
        edges.sort_by_key(|&(tail, ..)| tail);

        // prefix sum over the degrees
        let mut first_out = vec![0 as EdgeId; n + 1];
        for &(tail, ..) in &edges {
            first_out[tail as usize + 1] += 1;
        }
        for node in 0..n {
            first_out[node + 1] += first_out[node];
        }

        let mut head = Vec::with_capacity(edges.len());
        let mut tail = Vec::with_capacity(edges.len());
        let mut base_weight = Vec::with_capacity(edges.len());
        let mut multipliers = Vec::with_capacity(edges.len());
        for (t, h, w, m) in edges {
            tail.push(t);
            head.push(h);
            base_weight.push(w);
            multipliers.push(m);
        }

        RoadNetwork {
            first_out,
            head,
            tail,
            base_weight,
            multipliers,
            names: self.names,
            coords: self.coords,
            ids: self.ids,
        }
    }
}
