//! Runtime configuration.
//!
//! Values come from an optional JSON file, then environment variables override single fields.
//! Everything is validated once at load time, so later code can rely on sane values.

use crate::algo::congestion::{CongestionModel, DEFAULT_PENALTY, DEFAULT_THRESHOLD};
use crate::datastr::graph::ModeMultipliers;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

pub const HERE_API_KEY: &str = "HERE_API_KEY";
pub const HOTSPOT_THRESHOLD: &str = "ROUTEIQ_HOTSPOT_THRESHOLD";
pub const HOTSPOT_PENALTY: &str = "ROUTEIQ_HOTSPOT_PENALTY";
pub const POLL_INTERVAL: &str = "ROUTEIQ_POLL_INTERVAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub hotspot_threshold: f64,
    pub hotspot_penalty: f64,
    pub mode_multipliers: ModeMultipliers,
    /// Seconds between two polls of the traffic source.
    pub poll_interval_secs: u64,
    /// Time budget of a single search, unlimited if absent.
    pub search_timeout_ms: Option<u64>,
    pub city: String,
    pub here_api_key: Option<String>,
    pub alerts_file: PathBuf,
    pub history_file: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            hotspot_threshold: DEFAULT_THRESHOLD,
            hotspot_penalty: DEFAULT_PENALTY,
            mode_multipliers: ModeMultipliers::default(),
            poll_interval_secs: 60,
            search_timeout_ms: None,
            city: "Berlin".to_string(),
            here_api_key: None,
            alerts_file: PathBuf::from("alerts.json"),
            history_file: PathBuf::from("traffic_history.json"),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} has an invalid value: {:?}", name, value)))
}

impl RouterConfig {
    /// Load from a JSON file. Fields missing in the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RouterConfig =
            serde_json::from_str(&content).map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the given file, with the process environment applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())
    }

    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Override fields from variables looked up through `lookup` and validate the result.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(key) = lookup(HERE_API_KEY).filter(|key| !key.trim().is_empty()) {
            self.here_api_key = Some(key);
        }
        if let Some(value) = lookup(HOTSPOT_THRESHOLD) {
            self.hotspot_threshold = parse_var(HOTSPOT_THRESHOLD, &value)?;
        }
        if let Some(value) = lookup(HOTSPOT_PENALTY) {
            self.hotspot_penalty = parse_var(HOTSPOT_PENALTY, &value)?;
        }
        if let Some(value) = lookup(POLL_INTERVAL) {
            self.poll_interval_secs = parse_var(POLL_INTERVAL, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.congestion_model()?;
        self.mode_multipliers.validate().map_err(Error::InvalidConfig)?;
        if self.poll_interval_secs == 0 {
            return Err(Error::InvalidConfig("poll interval must be at least one second".to_string()));
        }
        Ok(())
    }

    pub fn congestion_model(&self) -> Result<CongestionModel> {
        CongestionModel::new(self.hotspot_threshold, self.hotspot_penalty)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = RouterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.congestion_model().unwrap(), CongestionModel::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.search_timeout(), None);
    }

    #[test]
    fn environment_overrides() {
        let config = RouterConfig::default()
            .apply_overrides(vars(&[
                (HERE_API_KEY, "secret"),
                (HOTSPOT_THRESHOLD, "2.0"),
                (HOTSPOT_PENALTY, " 25 "),
                (POLL_INTERVAL, "5"),
            ]))
            .unwrap();
        assert_eq!(config.here_api_key.as_deref(), Some("secret"));
        assert_eq!(config.hotspot_threshold, 2.0);
        assert_eq!(config.hotspot_penalty, 25.0);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [(HOTSPOT_THRESHOLD, "abc"), (HOTSPOT_THRESHOLD, "0"), (HOTSPOT_PENALTY, "0.5"), (POLL_INTERVAL, "0")];
        for pair in bad {
            assert!(
                matches!(RouterConfig::default().apply_overrides(vars(&[pair])), Err(Error::InvalidConfig(_))),
                "{:?} accepted",
                pair
            );
        }
    }

    #[test]
    fn file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routeiq.json");
        fs::write(&path, r#"{ "hotspot_penalty": 4.0, "mode_multipliers": { "car": 1.0, "bike": 3.0, "public": 1.5 } }"#).unwrap();
        let config = RouterConfig::from_file(&path).unwrap();
        assert_eq!(config.hotspot_penalty, 4.0);
        assert_eq!(config.hotspot_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.mode_multipliers.bike, 3.0);

        fs::write(&path, r#"{ "mode_multipliers": { "car": 0.0, "bike": 3.0, "public": 1.5 } }"#).unwrap();
        assert!(matches!(RouterConfig::from_file(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, r#"{ "hotspot_treshold": 2.0 }"#).unwrap();
        assert!(matches!(RouterConfig::from_file(&path), Err(Error::InvalidConfig(_))));
    }
}
