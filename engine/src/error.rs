use crate::datastr::graph::{NodeId, Weight};
use crate::poller::PollerState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown node: {0}")]
    InvalidNode(String),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("invalid weight {weight} on edge {from} -> {to}")]
    InvalidWeight { from: String, to: String, weight: Weight },

    #[error("traffic data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("poller cannot {action} while {state:?}")]
    PollerState { action: &'static str, state: PollerState },

    #[error("search worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::DataSourceUnavailable(err.to_string())
    }
}

/// Outcomes of a search that did not produce a route.
/// These are expected results, not failures of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no route between the given nodes")]
    NotFound,

    #[error("search exceeded its time budget")]
    Timeout,

    #[error("node {0} is not part of the graph")]
    InvalidNode(NodeId),
}
