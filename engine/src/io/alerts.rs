//! Edges an operator wants flagged when they become hotspots.

use super::{load_json, store_json};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    pub from: String,
    pub to: String,
}

impl Alert {
    pub fn new(from: &str, to: &str) -> Self {
        Alert {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn matches(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }
}

pub trait AlertRegistry {
    /// Register an alert. Returns `false` if it was already registered.
    fn add(&mut self, alert: Alert) -> Result<bool>;
    /// Returns `false` if no such alert was registered.
    fn remove(&mut self, alert: &Alert) -> Result<bool>;
    /// All alerts in registration order.
    fn list(&self) -> Result<Vec<Alert>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAlerts {
    alerts: Vec<Alert>,
}

impl AlertRegistry for MemoryAlerts {
    fn add(&mut self, alert: Alert) -> Result<bool> {
        if self.alerts.contains(&alert) {
            return Ok(false);
        }
        self.alerts.push(alert);
        Ok(true)
    }

    fn remove(&mut self, alert: &Alert) -> Result<bool> {
        let before = self.alerts.len();
        self.alerts.retain(|a| a != alert);
        Ok(self.alerts.len() != before)
    }

    fn list(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.clone())
    }
}

/// Alerts stored as a JSON array of `{ "from": .., "to": .. }` objects.
/// The file is read on every operation, so several processes can share it.
#[derive(Debug, Clone)]
pub struct JsonAlertFile {
    path: PathBuf,
}

impl JsonAlertFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonAlertFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<MemoryAlerts> {
        Ok(MemoryAlerts { alerts: load_json(&self.path)? })
    }
}

impl AlertRegistry for JsonAlertFile {
    fn add(&mut self, alert: Alert) -> Result<bool> {
        let mut alerts = self.load()?;
        let added = alerts.add(alert)?;
        if added {
            store_json(&self.path, &alerts.alerts)?;
        }
        Ok(added)
    }

    fn remove(&mut self, alert: &Alert) -> Result<bool> {
        let mut alerts = self.load()?;
        let removed = alerts.remove(alert)?;
        if removed {
            store_json(&self.path, &alerts.alerts)?;
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<Alert>> {
        Ok(self.load()?.alerts)
    }
}
