//! Background refresh of current weights.
//!
//! The poller owns one worker thread. The worker waits for the configured interval on a control
//! channel, so a stop request ends the wait immediately. A cycle which already started fetching
//! always runs to completion, the store never sees half a batch.

use crate::datastr::graph_store::{GraphStore, UpdateSummary};
use crate::error::{Error, Result};
use crate::import::{fetch_each, weight_updates, Area, TrafficSource};
use chrono::{DateTime, Utc};
use std::{
    sync::{
        mpsc::{channel, RecvTimeoutError, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollerStats {
    /// Completed refresh cycles.
    pub cycles: u64,
    /// Cycles in which at least one area could not be fetched.
    pub failures: u64,
    /// Store version after the last cycle which published weights.
    pub last_version: Option<u64>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Result of one refresh over all areas.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    /// `None` if no area delivered data and nothing was published.
    pub summary: Option<UpdateSummary>,
    pub failed_areas: Vec<String>,
}

/// Fetch all areas and apply everything that arrived as one batch.
/// Areas which fail keep their previous weights.
pub fn refresh(store: &GraphStore, source: &dyn TrafficSource, areas: &[Area]) -> Refresh {
    let mut updates = Vec::new();
    let mut failed_areas = Vec::new();

    for (area, result) in areas.iter().zip(fetch_each(source, areas)) {
        match result {
            Ok(segments) => updates.extend(weight_updates(&segments)),
            Err(e) => {
                warn!(source = source.name(), city = %area.city, error = %e, "fetch failed, keeping stale weights");
                failed_areas.push(area.city.clone());
            }
        }
    }

    let summary = if updates.is_empty() { None } else { Some(store.update_weights(&updates)) };
    Refresh { summary, failed_areas }
}

pub struct Poller {
    store: Arc<GraphStore>,
    source: Arc<dyn TrafficSource>,
    areas: Arc<[Area]>,
    interval: Duration,
    state: PollerState,
    stats: Arc<Mutex<PollerStats>>,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl Poller {
    pub fn new(store: Arc<GraphStore>, source: Arc<dyn TrafficSource>, areas: Vec<Area>, interval: Duration) -> Self {
        Poller {
            store,
            source,
            areas: areas.into(),
            interval,
            state: PollerState::Idle,
            stats: Arc::new(Mutex::new(PollerStats::default())),
            worker: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn stats(&self) -> PollerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the worker. Only possible once, from `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != PollerState::Idle {
            return Err(Error::PollerState {
                action: "start",
                state: self.state,
            });
        }

        let (tx, rx) = channel::<()>();
        let store = self.store.clone();
        let source = self.source.clone();
        let areas = self.areas.clone();
        let stats = self.stats.clone();
        let interval = self.interval;

        let handle = thread::Builder::new().name("routeiq-poller".to_string()).spawn(move || loop {
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => (),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let outcome = refresh(&store, &*source, &areas);
            let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.cycles += 1;
            if !outcome.failed_areas.is_empty() {
                stats.failures += 1;
            }
            if let Some(summary) = outcome.summary {
                stats.last_version = Some(summary.version);
            }
            stats.last_refresh = Some(Utc::now());
            info!(
                cycle = stats.cycles,
                version = ?stats.last_version,
                failed_areas = outcome.failed_areas.len(),
                "traffic refresh done"
            );
        })?;

        self.worker = Some((tx, handle));
        self.state = PollerState::Running;
        debug!(interval_ms = self.interval.as_millis() as u64, "poller started");
        Ok(())
    }

    /// Signal the worker and wait until it finished its current cycle.
    /// Stopping a poller which is not running only marks it as stopped.
    pub fn stop(&mut self) -> Result<()> {
        self.state = PollerState::Stopped;
        if let Some((tx, handle)) = self.worker.take() {
            // the worker may already be gone, then the send fails and join returns right away
            let _ = tx.send(());
            handle.join().map_err(|_| Error::WorkerPanicked)?;
            debug!("poller stopped");
        }
        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "poller worker did not shut down cleanly");
        }
    }
}
