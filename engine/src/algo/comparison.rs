//! Race Dijkstra against A* on the same snapshot.

use super::*;
use crate::benchmark::measure;
use crate::error::Error;
use tracing::debug;

/// Outcome and running time of one algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    pub outcome: Result<Route, SearchError>,
    pub elapsed: Duration,
}

impl AlgorithmRun {
    pub fn route(&self) -> Option<&Route> {
        self.outcome.as_ref().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub dijkstra: AlgorithmRun,
    pub astar: AlgorithmRun,
    pub snapshot_version: u64,
}

impl Comparison {
    /// Both found routes of the same cost (up to the relative tolerance `eps`), or both failed the same way.
    pub fn costs_agree(&self, eps: f64) -> bool {
        match (&self.dijkstra.outcome, &self.astar.outcome) {
            (Ok(d), Ok(a)) => (d.cost - a.cost).abs() <= eps * d.cost.abs().max(1.0),
            (Err(d), Err(a)) => d == a,
            _ => false,
        }
    }

    /// The run which found a route faster, if any found one.
    pub fn fastest(&self) -> Option<&AlgorithmRun> {
        [&self.dijkstra, &self.astar].into_iter().filter(|run| run.outcome.is_ok()).min_by_key(|run| run.elapsed)
    }
}

/// Run both algorithms concurrently against `ctx.snapshot` and wait for both.
/// A failed search of one algorithm does not affect the other.
pub fn compare(ctx: &SearchContext, query: &Query) -> Result<Comparison, Error> {
    let (dijkstra, astar) = crossbeam_utils::thread::scope(|s| {
        let dijkstra = s.spawn(|_| run(Algorithm::Dijkstra, ctx, query));
        let astar = s.spawn(|_| run(Algorithm::AStar, ctx, query));
        (dijkstra.join(), astar.join())
    })
    .map_err(|_| Error::WorkerPanicked)?;

    let comparison = Comparison {
        dijkstra: dijkstra.map_err(|_| Error::WorkerPanicked)?,
        astar: astar.map_err(|_| Error::WorkerPanicked)?,
        snapshot_version: ctx.snapshot.version(),
    };
    debug!(
        version = comparison.snapshot_version,
        dijkstra_ms = comparison.dijkstra.elapsed.as_secs_f64() * 1000.0,
        astar_ms = comparison.astar.elapsed.as_secs_f64() * 1000.0,
        "compared algorithms"
    );
    Ok(comparison)
}

fn run(algorithm: Algorithm, ctx: &SearchContext, query: &Query) -> AlgorithmRun {
    let (outcome, elapsed) = measure(|| algorithm.run(ctx, query));
    AlgorithmRun { algorithm, outcome, elapsed }
}
