//! Goal directed search with potentials.
//!
//! A potential estimates the remaining cost to the target.
//! As long as it never overestimates and is consistent, A* settles each node at most once
//! and returns routes exactly as cheap as Dijkstra.

use super::*;
use crate::algo::dijkstra::{search, DijkstraData};

pub trait Potential {
    fn init(&mut self, ctx: &SearchContext, query: &Query);
    fn potential(&mut self, ctx: &SearchContext, node: NodeId) -> Weight;
}

/// Reduces A* to plain Dijkstra.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPotential;

impl Potential for ZeroPotential {
    fn init(&mut self, _ctx: &SearchContext, _query: &Query) {}

    fn potential(&mut self, _ctx: &SearchContext, _node: NodeId) -> Weight {
        0.0
    }
}

// Rounding in the distance computations must not make the estimate overshoot.
const SCALE_SAFETY: f64 = 1.0 - 1e-9;

/// Straight line distance to the target, scaled by the cheapest cost per meter of any edge.
///
/// The scale is taken from the snapshot and mode of the query, so it corresponds to the fastest
/// speed possible anywhere in the network right now. Any route is at least as long as the
/// straight line, which makes the potential admissible and, by the triangle inequality, consistent.
/// Without coordinates for every node the potential is zero.
#[derive(Debug, Clone, Default)]
pub struct GeoPotential {
    target: Option<Coordinates>,
    scale: f64,
}

impl GeoPotential {
    /// Cost per meter used for the current query.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn cheapest_cost_per_meter(ctx: &SearchContext, query: &Query) -> f64 {
        let network = ctx.network;
        // avoidance penalties only make edges more expensive, the unpenalized cost is still a lower bound
        let plain = query.avoiding_hotspots(false);

        let mut scale = f64::INFINITY;
        for edge in 0..network.num_arcs() as EdgeId {
            let (tail, head) = (network.tail(edge), network.head(edge));
            if let (Some(t), Some(h)) = (network.coords(tail), network.coords(head)) {
                let length = t.distance_to(&h);
                if length > 0.0 {
                    scale = scale.min(ctx.edge_cost(edge, &plain) / length);
                }
            }
        }

        if scale.is_finite() {
            scale * SCALE_SAFETY
        } else {
            0.0
        }
    }
}

impl Potential for GeoPotential {
    fn init(&mut self, ctx: &SearchContext, query: &Query) {
        if ctx.network.has_all_coords() {
            self.target = ctx.network.coords(query.to);
            self.scale = Self::cheapest_cost_per_meter(ctx, query);
        } else {
            self.target = None;
            self.scale = 0.0;
        }
    }

    fn potential(&mut self, ctx: &SearchContext, node: NodeId) -> Weight {
        match (self.target, ctx.network.coords(node)) {
            (Some(target), Some(position)) if self.scale > 0.0 => position.distance_to(&target) * self.scale,
            _ => 0.0,
        }
    }
}

/// Shortest route by effective cost, guided by `potential`.
pub fn astar<P: Potential>(ctx: &SearchContext, query: &Query, potential: &mut P) -> Result<Route, SearchError> {
    let mut data = DijkstraData::new(ctx.network.num_nodes());
    search(ctx, query, potential, &mut data)
}
