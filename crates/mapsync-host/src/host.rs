//! Interfaces consumed from the host map editor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mapsync_core::{
    Disposer, EventKind, Feature, FeatureId, HostEvent, MapCenter, Record, Result,
    TileLayerOptions, ViewContext,
};

/// Callback invoked for every matching host event.
pub type EventHandler = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Pending one-shot subscription. Owns no borrow of the event source.
pub type NextEvent = Pin<Box<dyn Future<Output = Result<HostEvent>> + Send + 'static>>;

/// The host's map rendering surface.
///
/// Implementations must not call back into an overlay synchronously from
/// these methods.
pub trait MapSurface: Send + Sync {
    fn add_layer(&self, layer: &str) -> Result<()>;

    fn add_tile_layer(&self, layer: &str, options: &TileLayerOptions) -> Result<()>;

    fn remove_layer(&self, layer: &str) -> Result<()>;

    fn set_layer_z_index(&self, layer: &str, z_index: i32) -> Result<()>;

    /// Ask the host to deliver click events for features on `layer`.
    fn track_layer_events(&self, layer: &str) -> Result<()>;

    fn add_features(&self, layer: &str, features: Vec<Feature>) -> Result<()>;

    fn remove_features(&self, layer: &str, ids: &[FeatureId]) -> Result<()>;

    fn zoom_level(&self) -> u8;

    fn center(&self) -> MapCenter;

    fn view(&self) -> ViewContext {
        ViewContext {
            center: self.center(),
            zoom: self.zoom_level(),
        }
    }
}

/// The host's layer switcher panel.
pub trait LayerSwitcher: Send + Sync {
    fn add_layer_checkbox(&self, name: &str) -> Result<()>;

    /// Check or uncheck a checkbox. The host fires the toggle event.
    fn set_layer_checkbox_checked(&self, name: &str, checked: bool) -> Result<()>;
}

/// The host's event bus.
pub trait EventSource: Send + Sync {
    /// Subscribe to `kind`. The returned disposer unsubscribes.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Disposer;

    /// Resolve with the next event of `kind`.
    ///
    /// The subscription is taken when this is called, not when the returned
    /// future is first polled.
    fn subscribe_once(&self, kind: EventKind) -> NextEvent;
}

/// Supplier of fresh records for a viewport.
pub trait RecordSource: Send + Sync {
    /// Fails with `Error::Fetch` on transport or decode failure.
    fn fetch_records(
        &self,
        hint: &ViewContext,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;
}
