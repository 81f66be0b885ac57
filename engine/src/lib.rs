//! Traffic-aware routing on a city road network.
//!
//! The road network is a static directed graph. Each edge carries a fixed base weight
//! (free-flow cost) and a current weight that changes while traffic data is polled.
//! Queries run on a snapshot of the current weights, so a poller can keep writing
//! while any number of searches are in flight.
//!
//! The main entry points are:
//!
//! - [`datastr::graph_store::GraphStore`] which owns topology and weights,
//! - [`algo::dijkstra::dijkstra`] and [`algo::a_star::astar`] for single queries,
//! - [`algo::comparison::compare`] to race both algorithms on one snapshot,
//! - [`poller::Poller`] to keep weights fresh in the background.

pub mod algo;
pub mod benchmark;
pub mod config;
pub mod datastr;
pub mod error;
pub mod export;
pub mod import;
pub mod io;
pub mod poller;

pub use error::{Error, Result, SearchError};
