//! Delta-rendered feature overlay.
//!
//! While enabled, every map move triggers a render pass: fetch records for the
//! viewport, diff them against the rendered set and push only the additions
//! and removals to the host. Passes that were in flight across a disable are
//! discarded when they resume.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mapsync_core::{
    Disposer, EventKind, Feature, FeatureClickEvent, FeatureId, FeatureLayerConfig, HostEvent,
    Result,
};
use mapsync_host::{
    EventHandler, EventSource, LayerStateStore, LayerSwitcher, MapSurface, RecordSource,
};
use mapsync_sync::{OverlaySession, OverlayState};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::checkbox::{restore_when_ready, subscribe_toggle};

/// Callback for clicks on this overlay's features.
pub type ClickCallback = Arc<dyn Fn(&FeatureClickEvent) + Send + Sync>;

/// What a render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Overlay was disabled when the pass started.
    Disabled,
    /// Zoom below the configured minimum; nothing fetched.
    BelowMinZoom,
    /// Overlay was disabled or re-enabled while the fetch was pending.
    Stale,
    /// Fetched records already match the rendered set.
    Unchanged,
    Applied { added: usize, removed: usize },
}

pub struct FeatureOverlay<M, E, S> {
    config: FeatureLayerConfig,
    map: Arc<M>,
    events: Arc<E>,
    source: Arc<S>,
    store: Option<Arc<LayerStateStore>>,
    on_click: Option<ClickCallback>,
    session: Mutex<OverlaySession>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl<M, E, S> FeatureOverlay<M, E, S>
where
    M: MapSurface + LayerSwitcher + 'static,
    E: EventSource + 'static,
    S: RecordSource + 'static,
{
    pub fn new(config: FeatureLayerConfig, map: Arc<M>, events: Arc<E>, source: Arc<S>) -> Self {
        Self {
            config,
            map,
            events,
            source,
            store: None,
            on_click: None,
            session: Mutex::new(OverlaySession::new()),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Persist checkbox toggles to `store`.
    pub fn with_state_store(mut self, store: Arc<LayerStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_click_handler(mut self, on_click: ClickCallback) -> Self {
        self.on_click = Some(on_click);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> OverlayState {
        self.session.lock().state()
    }

    /// Ids currently on the map, sorted.
    pub fn rendered_ids(&self) -> Vec<FeatureId> {
        self.session.lock().rendered().iter().cloned().collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.session.lock().subscription_count()
    }

    /// Add the layer checkbox and follow its toggles.
    ///
    /// The returned disposer drops the toggle subscription; it is not part of
    /// the enable-period registry.
    pub fn install(self: &Arc<Self>) -> Result<Disposer> {
        self.map.add_layer_checkbox(&self.config.name)?;
        let overlay = Arc::downgrade(self);
        let dispose = subscribe_toggle(self.events.as_ref(), &self.config.name, move |checked| {
            if let Some(overlay) = overlay.upgrade() {
                overlay.on_toggle(checked);
            }
        });
        info!("Installed feature overlay {}", self.config.name);
        Ok(dispose)
    }

    /// Check the checkbox after the host is ready if it was last left on.
    ///
    /// `None` when no state store is attached.
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

    /// Apply a checkbox toggle.
    ///
    /// Enabling spawns the initial render pass and returns its handle, so this
    /// must run inside a Tokio runtime. A repeated toggle is a no-op.
    pub fn on_toggle(
        self: &Arc<Self>,
        checked: bool,
    ) -> Option<JoinHandle<Result<PassOutcome>>> {
        if let Some(store) = &self.store {
            store.save(&self.config.name, checked);
        }
        if checked {
            self.enable()
        } else {
            self.disable();
            None
        }
    }

    fn enable(self: &Arc<Self>) -> Option<JoinHandle<Result<PassOutcome>>> {
        if !self.session.lock().enable() {
            debug!("{} already enabled", self.config.name);
            return None;
        }

        let name = &self.config.name;
        if let Err(e) = self
            .map
            .add_layer(name)
            .and_then(|_| self.map.track_layer_events(name))
        {
            warn!("Failed to add layer {}: {}", name, e);
        }
        self.subscribe_map_events();
        info!("{} enabled", name);
        Some(self.spawn_pass())
    }

    /// Remove the layer, then forget rendered ids and release subscriptions.
    fn disable(&self) {
        let report = {
            let mut session = self.session.lock();
            if !session.is_enabled() {
                debug!("{} already disabled", self.config.name);
                return;
            }
            if let Err(e) = self.map.remove_layer(&self.config.name) {
                warn!("Failed to remove layer {}: {}", self.config.name, e);
            }
            session.disable().unwrap_or_default()
        };

        for failure in &report.failures {
            warn!("Cleanup for {} failed: {}", self.config.name, failure);
        }
        info!(
            "{} disabled ({} subscriptions released)",
            self.config.name, report.disposed
        );
    }

    fn subscribe_map_events(self: &Arc<Self>) {
        let overlay = Arc::downgrade(self);
        let move_end: EventHandler = Arc::new(move |_: &HostEvent| {
            if let Some(overlay) = overlay.upgrade() {
                overlay.spawn_pass();
            }
        });

        let overlay = Arc::downgrade(self);
        let click: EventHandler = Arc::new(move |event: &HostEvent| {
            if let (HostEvent::FeatureClicked(click), Some(overlay)) = (event, overlay.upgrade()) {
                overlay.on_feature_click(click);
            }
        });

        let disposers = [
            self.events.subscribe(EventKind::MapMoveEnd, move_end),
            self.events.subscribe(EventKind::LayerFeatureClicked, click),
        ];
        let mut session = self.session.lock();
        for dispose in disposers {
            if let Err(e) = session.register(dispose) {
                warn!("Subscription for {} not kept: {}", self.config.name, e);
            }
        }
    }

    fn spawn_pass(self: &Arc<Self>) -> JoinHandle<Result<PassOutcome>> {
        let overlay = self.clone();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let outcome = overlay.on_re_render_trigger().await;
            if let Err(e) = &outcome {
                warn!("Render pass for {} failed: {}", overlay.config.name, e);
            }
            if overlay.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                overlay.idle.notify_waiters();
            }
            outcome
        })
    }

    /// Wait until every pass spawned by a toggle or move-end has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn on_feature_click(&self, click: &FeatureClickEvent) {
        if click.layer_name != self.config.name {
            return;
        }
        info!("Feature clicked: {} on {}", click.feature_id, click.layer_name);
        if let Some(on_click) = &self.on_click {
            on_click(click);
        }
    }

    /// Run one render pass against the current viewport.
    ///
    /// A fetch error leaves the rendered set untouched. If the overlay is
    /// disabled or re-enabled while the fetch is pending the result is
    /// discarded without touching the host.
    pub async fn on_re_render_trigger(&self) -> Result<PassOutcome> {
        let generation = {
            let session = self.session.lock();
            if !session.is_enabled() {
                return Ok(PassOutcome::Disabled);
            }
            session.generation()
        };

        let view = self.map.view();
        if view.zoom < self.config.min_zoom {
            debug!(
                "{}: zoom {} below {}, skipping fetch",
                self.config.name, view.zoom, self.config.min_zoom
            );
            return Ok(PassOutcome::BelowMinZoom);
        }

        let records = self.source.fetch_records(&view).await?;

        let mut session = self.session.lock();
        if !session.is_current(generation) {
            debug!("{}: discarding stale render pass", self.config.name);
            return Ok(PassOutcome::Stale);
        }

        let plan = session.plan(records);
        if plan.is_noop() {
            return Ok(PassOutcome::Unchanged);
        }

        if !plan.to_add.is_empty() {
            let features = plan.to_add.iter().map(Feature::from).collect();
            self.map.add_features(&self.config.name, features)?;
            session.mark_added(&plan.to_add);
        }
        if !plan.to_remove.is_empty() {
            self.map
                .remove_features(&self.config.name, &plan.to_remove)?;
            session.mark_removed(&plan.to_remove);
        }

        debug!(
            "{}: +{} -{} ({} rendered)",
            self.config.name,
            plan.to_add.len(),
            plan.to_remove.len(),
            session.rendered().len()
        );
        Ok(PassOutcome::Applied {
            added: plan.to_add.len(),
            removed: plan.to_remove.len(),
        })
    }
}
