//! Collaborators which keep state on disk: the alert registry and the historical weight log.
//!
//! Both come as an in-memory version and a JSON file backed version.
//! A missing file is treated as empty.

use serde::{de::DeserializeOwned, Serialize};
use std::{fs, io::ErrorKind, path::Path};

use crate::error::Result;

pub mod alerts;
pub mod history;

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(T::default()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

fn store_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
