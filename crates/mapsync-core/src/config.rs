//! Overlay configuration and data directory handling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::TileLayerOptions;

/// Settings for the delta-rendered feature overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureLayerConfig {
    #[serde(default = "default_feature_layer_name")]
    pub name: String,
    /// Below this zoom level no data is fetched.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    /// Base URL of the record endpoint. Queried with `lat` and `lon`.
    #[serde(default = "default_data_url")]
    pub data_url: String,
}

fn default_feature_layer_name() -> String {
    "My Feature Layer".into()
}
fn default_min_zoom() -> u8 {
    15
}
fn default_data_url() -> String {
    "https://api.example.com/data".into()
}

impl Default for FeatureLayerConfig {
    fn default() -> Self {
        Self {
            name: default_feature_layer_name(),
            min_zoom: default_min_zoom(),
            data_url: default_data_url(),
        }
    }
}

/// Settings for the raster tile overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileLayerConfig {
    #[serde(default = "default_tile_layer_name")]
    pub name: String,
    #[serde(default = "default_z_index")]
    pub z_index: i32,
    #[serde(default = "default_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_tile_size")]
    pub tile_height: u32,
    /// Tile path template, e.g. `${z}/${x}/${y}.png`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
}

fn default_tile_layer_name() -> String {
    "My Tile Overlay".into()
}
fn default_z_index() -> i32 {
    2039
}
fn default_tile_size() -> u32 {
    256
}
fn default_file_name() -> String {
    "${z}/${x}/${y}.png".into()
}
fn default_servers() -> Vec<String> {
    vec!["https://tiles.example.com/layer/default/current/3857".into()]
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            name: default_tile_layer_name(),
            z_index: default_z_index(),
            tile_width: default_tile_size(),
            tile_height: default_tile_size(),
            file_name: default_file_name(),
            servers: default_servers(),
        }
    }
}

impl TileLayerConfig {
    pub fn options(&self) -> TileLayerOptions {
        TileLayerOptions {
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            file_name: self.file_name.clone(),
            servers: self.servers.clone(),
        }
    }
}

/// Top-level MapSync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSyncConfig {
    #[serde(default = "default_script_id")]
    pub script_id: String,
    #[serde(default = "default_script_name")]
    pub script_name: String,
    #[serde(default)]
    pub feature_layer: FeatureLayerConfig,
    #[serde(default)]
    pub tile_layer: TileLayerConfig,
    /// Root data directory (not serialized).
    #[serde(skip)]
    pub data_dir: PathBuf,
}

fn default_script_id() -> String {
    "my-script-id".into()
}
fn default_script_name() -> String {
    "My Script Name".into()
}

impl Default for MapSyncConfig {
    fn default() -> Self {
        Self {
            script_id: default_script_id(),
            script_name: default_script_name(),
            feature_layer: FeatureLayerConfig::default(),
            tile_layer: TileLayerConfig::default(),
            data_dir: PathBuf::new(),
        }
    }
}

impl MapSyncConfig {
    /// Load `config.json` from the data directory, or return defaults.
    ///
    /// A corrupt file is logged and replaced by defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("config.json");
        let mut config: MapSyncConfig = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring unreadable config {}: {}", path.display(), e);
                MapSyncConfig::default()
            }),
            Err(_) => MapSyncConfig::default(),
        };
        config.data_dir = data_dir.to_path_buf();
        config
    }

    /// Load from the data directory and apply environment overrides.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let mut config = Self::load(data_dir);

        if let Ok(url) = std::env::var("MAPSYNC_DATA_URL") {
            config.feature_layer.data_url = url;
        }
        if let Ok(zoom) = std::env::var("MAPSYNC_MIN_ZOOM") {
            config.feature_layer.min_zoom = zoom
                .parse()
                .map_err(|_| Error::Config(format!("invalid MAPSYNC_MIN_ZOOM: {}", zoom)))?;
        }

        Ok(config)
    }

    /// Path of the persisted checkbox states.
    pub fn layer_state_file(&self) -> PathBuf {
        self.data_dir.join("layer-state.json")
    }
}
