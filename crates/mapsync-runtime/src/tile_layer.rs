//! Raster tile overlay toggled from the layer switcher.

use std::future::Future;
use std::sync::Arc;

use mapsync_core::{Disposer, Result, TileLayerConfig};
use mapsync_host::{EventSource, LayerStateStore, LayerSwitcher, MapSurface};
use mapsync_sync::OverlayState;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::checkbox::{restore_when_ready, subscribe_toggle, Transition};

pub struct TileOverlay<M, E> {
    config: TileLayerConfig,
    map: Arc<M>,
    events: Arc<E>,
    store: Option<Arc<LayerStateStore>>,
    state: Mutex<OverlayState>,
}

impl<M, E> TileOverlay<M, E>
where
    M: MapSurface + LayerSwitcher + 'static,
    E: EventSource + 'static,
{
    pub fn new(config: TileLayerConfig, map: Arc<M>, events: Arc<E>) -> Self {
        Self {
            config,
            map,
            events,
            store: None,
            state: Mutex::new(OverlayState::Disabled),
        }
    }

    pub fn with_state_store(mut self, store: Arc<LayerStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> OverlayState {
        *self.state.lock()
    }

    /// Add the layer checkbox and follow its toggles.
    pub fn install(self: &Arc<Self>) -> Result<Disposer> {
        self.map.add_layer_checkbox(&self.config.name)?;
        let overlay = Arc::downgrade(self);
        let dispose = subscribe_toggle(self.events.as_ref(), &self.config.name, move |checked| {
            if let Some(overlay) = overlay.upgrade() {
                overlay.on_toggle(checked);
            }
        });
        info!("Installed tile overlay {}", self.config.name);
        Ok(dispose)
    }

    /// See [`crate::FeatureOverlay::restore_when_ready`].
    pub fn restore_when_ready(
        &self,
    ) -> Option<impl Future<Output = Result<bool>> + Send + 'static> {
        let store = self.store.clone()?;
        Some(restore_when_ready(
            self.events.as_ref(),
            self.map.clone(),
            store,
            &self.config.name,
        ))
    }

    /// Add or remove the tile layer. A toggle matching the current state does
    /// nothing beyond persisting it.
    pub fn on_toggle(&self, checked: bool) -> Transition {
        if let Some(store) = &self.store {
            store.save(&self.config.name, checked);
        }

        let target = if checked {
            OverlayState::Enabled
        } else {
            OverlayState::Disabled
        };
        {
            let mut state = self.state.lock();
            if *state == target {
                debug!("{} already {:?}", self.config.name, target);
                return Transition::Unchanged;
            }
            *state = target;
        }

        let name = &self.config.name;
        if checked {
            let added = self
                .map
                .add_tile_layer(name, &self.config.options())
                .and_then(|_| self.map.set_layer_z_index(name, self.config.z_index));
            if let Err(e) = added {
                warn!("Failed to add tile layer {}: {}", name, e);
            }
            info!("{} enabled", name);
            Transition::Enabled
        } else {
            if let Err(e) = self.map.remove_layer(name) {
                warn!("Failed to remove tile layer {}: {}", name, e);
            }
            info!("{} disabled", name);
            Transition::Disabled
        }
    }
}
