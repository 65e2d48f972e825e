//! Overlay controllers — wire host events to reconciliation and lifecycle.
//!
//! `FeatureOverlay` keeps a vector layer in sync with a record source using
//! delta passes; `TileOverlay` toggles a raster layer. Both follow the layer
//! switcher checkbox and can restore their last persisted state once the host
//! reports ready.

pub mod checkbox;
pub mod feature_layer;
pub mod tile_layer;

pub use checkbox::{restore_when_ready, subscribe_toggle, Transition};
pub use feature_layer::{ClickCallback, FeatureOverlay, PassOutcome};
pub use tile_layer::TileOverlay;
