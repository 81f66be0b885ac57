//! Data structures used by algorithms.

pub mod graph;
pub mod graph_store;
pub mod index_heap;
