//! Host collaborators for map overlays.
//!
//! Defines the interfaces the overlay core consumes from the host map editor
//! (map surface, layer switcher, event bus, record source) and ships the
//! adapters used outside a live editor: an in-process `EventBus`, an
//! in-memory `RecordingMap`, a JSON-backed `LayerStateStore` and an HTTP
//! `HttpRecordSource`.

pub mod events;
pub mod host;
pub mod http;
pub mod memory;
pub mod store;

pub use events::EventBus;
pub use host::{EventHandler, EventSource, LayerSwitcher, MapSurface, NextEvent, RecordSource};
pub use http::HttpRecordSource;
pub use memory::{MapCall, RecordingMap};
pub use store::LayerStateStore;
