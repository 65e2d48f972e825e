//! Persisted layer checkbox states.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mapsync_core::Result;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Layer name → last checked value, stored as a flat JSON object.
pub struct LayerStateStore {
    path: PathBuf,
    states: RwLock<HashMap<String, bool>>,
}

impl LayerStateStore {
    /// Open the store at `path`. A missing or corrupt file yields an empty store.
    pub fn open(path: &Path) -> Self {
        let states = load_states(path);
        debug!("LayerStateStore: {} layer states loaded", states.len());
        Self {
            path: path.to_path_buf(),
            states: RwLock::new(states),
        }
    }

    /// Last stored value for `layer`, or `None` if it was never toggled.
    pub fn is_enabled(&self, layer: &str) -> Option<bool> {
        self.states.read().get(layer).copied()
    }

    /// Record a toggle. Write failures are logged, not returned.
    pub fn save(&self, layer: &str, checked: bool) {
        self.states.write().insert(layer.to_string(), checked);
        if let Err(e) = self.persist() {
            warn!("Failed to save layer state for {}: {}", layer, e);
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&*self.states.read())?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

fn load_states(path: &Path) -> HashMap<String, bool> {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!("Ignoring unreadable layer state {}: {}", path.display(), e);
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}
