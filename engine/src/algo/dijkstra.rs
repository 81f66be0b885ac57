//! Dijkstra's algorithm on a weight snapshot.
//!
//! The same search loop drives A*: the queue key of a node is its tentative distance plus a potential.
//! Plain Dijkstra just uses the `ZeroPotential`.

use super::*;
use crate::algo::a_star::{Potential, ZeroPotential};
use crate::datastr::index_heap::*;
use std::{cmp::Ordering, time::Instant};
use tracing::debug;

/// The deadline is only checked every this many settled nodes.
const DEADLINE_CHECK_INTERVAL: usize = 1024;

/// Priority Queue entries.
/// Equal keys are ordered by push sequence, so the node discovered first is settled first.
#[derive(Copy, Clone, Debug)]
pub struct State {
    pub key: Weight,
    pub seq: u64,
    pub node: NodeId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl Indexing for State {
    #[inline]
    fn as_index(&self) -> usize {
        self.node as usize
    }
}

/// Search state which can be reused between queries on graphs of the same size.
#[derive(Debug, Clone)]
pub struct DijkstraData {
    pub distances: Vec<Weight>,
    pub predecessors: Vec<Option<(NodeId, EdgeId)>>,
    pub settled: Vec<bool>,
    pub queue: IndexdMinHeap<State>,
    next_seq: u64,
}

impl DijkstraData {
    pub fn new(n: usize) -> Self {
        DijkstraData {
            distances: vec![INFINITY; n],
            predecessors: vec![None; n],
            settled: vec![false; n],
            queue: IndexdMinHeap::new(n),
            next_seq: 0,
        }
    }

    fn reset(&mut self, n: usize) {
        if self.distances.len() != n {
            *self = DijkstraData::new(n);
            return;
        }
        self.distances.iter_mut().for_each(|d| *d = INFINITY);
        self.predecessors.iter_mut().for_each(|p| *p = None);
        self.settled.iter_mut().for_each(|s| *s = false);
        self.queue.clear();
        self.next_seq = 0;
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Nodes on the path from `from` to `to`. Only valid after `to` was settled.
    pub fn node_path(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        let mut path = vec![to];
        let mut cur = to;
        while cur != from {
            match self.predecessors[cur as usize] {
                Some((pred, _)) => {
                    path.push(pred);
                    cur = pred;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Edges on the path from `from` to `to`. Only valid after `to` was settled.
    pub fn edge_path(&self, from: NodeId, to: NodeId) -> Vec<EdgeId> {
        let mut path = Vec::new();
        let mut cur = to;
        while cur != from {
            match self.predecessors[cur as usize] {
                Some((pred, edge)) => {
                    path.push(edge);
                    cur = pred;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Shortest route by effective cost.
pub fn dijkstra(ctx: &SearchContext, query: &Query) -> Result<Route, SearchError> {
    let mut data = DijkstraData::new(ctx.network.num_nodes());
    search(ctx, query, &mut ZeroPotential, &mut data)
}

/// Run the search loop with the given potential, reusing `data`.
pub fn search<P: Potential>(ctx: &SearchContext, query: &Query, potential: &mut P, data: &mut DijkstraData) -> Result<Route, SearchError> {
    let n = ctx.network.num_nodes();
    for node in [query.from, query.to] {
        if node as usize >= n {
            return Err(SearchError::InvalidNode(node));
        }
    }

    let deadline = ctx.timeout.and_then(|timeout| Instant::now().checked_add(timeout));
    data.reset(n);
    potential.init(ctx, query);

    data.distances[query.from as usize] = 0.0;
    let key = potential.potential(ctx, query.from);
    let seq = data.next_seq();
    data.queue.push(State { key, seq, node: query.from });

    let mut settled_nodes = 0;
    while let Some(State { node, .. }) = data.queue.pop() {
        if settled_nodes % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    debug!(from = query.from, to = query.to, settled_nodes, "search timed out");
                    return Err(SearchError::Timeout);
                }
            }
        }

        data.settled[node as usize] = true;
        settled_nodes += 1;

        if node == query.to {
            debug!(from = query.from, to = query.to, settled_nodes, "route found");
            return Ok(build_route(ctx, query, data, settled_nodes));
        }

        let distance = data.distances[node as usize];
        for link in ctx.network.neighbor_iter(node) {
            let head = link.node as usize;
            if data.settled[head] {
                continue;
            }

            // saturate, a sum of finite hotspot costs may still overflow
            let tentative = (distance + ctx.edge_cost(link.edge, query)).min(f64::MAX);
            // strictly better labels only, so the first discovered of two equal paths wins
            let reached = data.predecessors[head].is_some();
            if !reached || tentative < data.distances[head] {
                data.distances[head] = tentative;
                data.predecessors[head] = Some((node, link.edge));

                let key = (tentative + potential.potential(ctx, link.node)).min(f64::MAX);
                let seq = data.next_seq();
                let next = State { key, seq, node: link.node };
                if data.queue.contains_index(head) {
                    data.queue.decrease_key(next);
                } else {
                    data.queue.push(next);
                }
            }
        }
    }

    debug!(from = query.from, to = query.to, settled_nodes, "target not reachable");
    Err(SearchError::NotFound)
}

fn build_route(ctx: &SearchContext, query: &Query, data: &DijkstraData, settled_nodes: usize) -> Route {
    let edges = data.edge_path(query.from, query.to);
    let hotspots = edges
        .iter()
        .copied()
        .filter(|&edge| ctx.congestion.is_hotspot(ctx.network, ctx.snapshot, edge))
        .collect();

    Route {
        nodes: data.node_path(query.from, query.to),
        edges,
        cost: data.distances[query.to as usize],
        hotspots,
        settled_nodes,
        snapshot_version: ctx.snapshot.version(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_pop_in_push_order() {
        let mut queue = IndexdMinHeap::new(3);
        queue.push(State { key: 5.0, seq: 2, node: 0 });
        queue.push(State { key: 5.0, seq: 1, node: 2 });
        queue.push(State { key: 4.0, seq: 3, node: 1 });
        let order: Vec<NodeId> = std::iter::from_fn(|| queue.pop()).map(|s| s.node).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn reused_data_is_reset() {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("A", "B", 1.0).unwrap();
        builder.add_edge("B", "C", 1.0).unwrap();
        let store = crate::datastr::graph_store::GraphStore::with_base_weights(builder.build());
        let snapshot = store.snapshot();
        let congestion = CongestionModel::default();
        let ctx = SearchContext::new(store.network(), &snapshot, &congestion);
        let net = store.network();
        let (a, b, c) = (net.resolve("A").unwrap(), net.resolve("B").unwrap(), net.resolve("C").unwrap());

        let mut data = DijkstraData::new(0);
        let first = search(&ctx, &Query::new(a, c), &mut ZeroPotential, &mut data).unwrap();
        assert_eq!(first.nodes, vec![a, b, c]);
        let second = search(&ctx, &Query::new(b, a), &mut ZeroPotential, &mut data);
        assert_eq!(second, Err(SearchError::NotFound));
        let third = search(&ctx, &Query::new(b, c), &mut ZeroPotential, &mut data).unwrap();
        assert_eq!(third.cost, 1.0);
        assert_eq!(third.nodes, vec![b, c]);
    }

    #[test]
    fn huge_penalties_saturate_instead_of_overflowing() {
        let mut builder = NetworkBuilder::default();
        builder.add_edge("A", "B", 1.0).unwrap();
        builder.add_edge("B", "C", 1.0).unwrap();
        let store = crate::datastr::graph_store::GraphStore::with_base_weights(builder.build());
        let updates: Vec<_> = [("A", "B"), ("B", "C")]
            .iter()
            .map(|&(from, to)| crate::datastr::graph_store::WeightUpdate {
                from: from.to_string(),
                to: to.to_string(),
                weight: 2.0,
            })
            .collect();
        store.update_weights(&updates);

        let snapshot = store.snapshot();
        let congestion = CongestionModel::new(1.5, 1e308).unwrap();
        let ctx = SearchContext::new(store.network(), &snapshot, &congestion);
        let net = store.network();
        let query = Query::new(net.resolve("A").unwrap(), net.resolve("C").unwrap()).avoiding_hotspots(true);

        let route = search(&ctx, &query, &mut ZeroPotential, &mut DijkstraData::new(0)).unwrap();
        assert!(route.cost.is_finite());
        assert_eq!(route.cost, f64::MAX);
        assert_eq!(route.hotspots.len(), 2);

        let comparison = crate::algo::comparison::compare(&ctx, &query).unwrap();
        assert_eq!(comparison.astar.route().map(|r| r.cost), Some(f64::MAX));
        assert!(comparison.costs_agree(1e-9));
    }
}
