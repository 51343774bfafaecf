//! Characteristic cache
//!
//! Remembers which characteristics each device exposed so the next session
//! can skip guessing. Stored as JSON:
//!
//! ```json
//! { "AA:BB:CC:DD:EE:FF": { "write": "...", "notify": "...", "read": ["..."], "updated": "2024-03-09T17:05:42+00:00" } }
//! ```

use crate::error::{Error, Result};
use crate::session::Endpoints;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Characteristics recorded for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDevice {
    pub write: String,
    pub notify: String,
    #[serde(default)]
    pub read: Vec<String>,
    /// RFC 3339 time of the last update
    pub updated: String,
}

impl CachedDevice {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            write: self.write.clone(),
            notify: self.notify.clone(),
        }
    }
}

/// Device-keyed cache backed by one JSON file
#[derive(Debug, Clone)]
pub struct CharacteristicCache {
    path: PathBuf,
    devices: BTreeMap<String, CachedDevice>,
}

impl CharacteristicCache {
    /// Empty cache that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            devices: BTreeMap::new(),
        }
    }

    /// Read the cache file; a missing file yields an empty cache
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("No cache at {}", path.display());
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let devices = serde_json::from_str(&content).map_err(|e| Error::CacheFormat {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { path, devices })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, device: &str) -> Option<&CachedDevice> {
        self.devices.get(device)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Record a device's endpoints and readable characteristics, stamped now
    pub fn record(&mut self, device: &str, endpoints: &Endpoints, readable: Vec<String>) {
        self.devices.insert(
            device.to_string(),
            CachedDevice {
                write: endpoints.write.clone(),
                notify: endpoints.notify.clone(),
                read: readable,
                updated: Utc::now().to_rfc3339(),
            },
        );
    }

    pub fn remove(&mut self, device: &str) -> Option<CachedDevice> {
        self.devices.remove(device)
    }

    /// Write the cache file
    pub fn save(&self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.devices).map_err(|e| Error::CacheFormat {
                path: self.path.clone(),
                source: e,
            })?;
        fs::write(&self.path, content).map_err(|e| Error::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}
