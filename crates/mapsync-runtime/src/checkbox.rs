//! Layer checkbox plumbing shared by the overlays.

use std::future::Future;
use std::sync::Arc;

use mapsync_core::{Disposer, EventKind, HostEvent, Result};
use mapsync_host::{EventHandler, EventSource, LayerStateStore, LayerSwitcher};
use tracing::info;

/// Effect of a toggle on an overlay's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enabled,
    Disabled,
    /// Toggle matched the current state; nothing happened.
    Unchanged,
}

/// Subscribe to checkbox toggles for `layer` only.
///
/// Toggles for other layers are ignored before `on_toggle` is called.
pub fn subscribe_toggle<E, F>(events: &E, layer: &str, on_toggle: F) -> Disposer
where
    E: EventSource,
    F: Fn(bool) + Send + Sync + 'static,
{
    let layer = layer.to_string();
    let handler: EventHandler = Arc::new(move |event: &HostEvent| {
        if let HostEvent::CheckboxToggled(toggle) = event {
            if toggle.name == layer {
                on_toggle(toggle.checked);
            }
        }
    });
    events.subscribe(EventKind::LayerCheckboxToggled, handler)
}

/// Wait for the host ready event, then re-check `layer` if it was left on.
///
/// The ready subscription is taken before this returns, so an event emitted
/// before the future is first polled is not missed. Resolves to whether the
/// checkbox was restored.
pub fn restore_when_ready<E, L>(
    events: &E,
    switcher: Arc<L>,
    store: Arc<LayerStateStore>,
    layer: &str,
) -> impl Future<Output = Result<bool>> + Send + 'static
where
    E: EventSource + 'static,
    L: LayerSwitcher + 'static,
{
    let ready = events.subscribe_once(EventKind::Ready);
    let layer = layer.to_string();
    async move {
        ready.await?;
        if store.is_enabled(&layer) != Some(true) {
            return Ok(false);
        }
        info!("Restoring persisted state for {}", layer);
        switcher.set_layer_checkbox_checked(&layer, true)?;
        Ok(true)
    }
}
