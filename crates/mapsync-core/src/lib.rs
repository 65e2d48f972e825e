//! MapSync Core — records, features, host events, configuration, errors.

pub mod config;
pub mod error;
pub mod types;

pub use config::{FeatureLayerConfig, MapSyncConfig, TileLayerConfig};
pub use error::{Error, Result};
pub use types::*;
