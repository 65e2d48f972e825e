//! Per-overlay session state.

use mapsync_core::{Disposer, FeatureId, Record, Result};

use crate::lifecycle::{LifecycleManager, OverlayState, TeardownReport};
use crate::reconcile::{reconcile, Reconciliation, RenderedSet};

/// Everything one overlay tracks between toggle events.
///
/// A fresh generation is taken on every enable. A reconciliation pass records
/// the generation it started in and only applies its result while
/// [`OverlaySession::is_current`] still holds, so a pass that was suspended
/// across a disable (or a disable/enable pair) cannot repopulate the overlay.
#[derive(Default)]
pub struct OverlaySession {
    lifecycle: LifecycleManager,
    rendered: RenderedSet,
    generation: u64,
}

impl OverlaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OverlayState {
        self.lifecycle.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.is_enabled()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rendered(&self) -> &RenderedSet {
        &self.rendered
    }

    /// Number of subscriptions held for the current enable period.
    pub fn subscription_count(&self) -> usize {
        self.lifecycle.len()
    }

    /// Start a new enable period. Returns false if already enabled.
    pub fn enable(&mut self) -> bool {
        if !self.lifecycle.enable() {
            return false;
        }
        self.generation += 1;
        self.rendered.clear();
        true
    }

    /// End the enable period: tear down subscriptions, forget rendered ids.
    pub fn disable(&mut self) -> Option<TeardownReport> {
        if !self.is_enabled() {
            return None;
        }
        self.rendered.clear();
        self.lifecycle.disable()
    }

    pub fn register(&mut self, disposer: Disposer) -> Result<()> {
        self.lifecycle.register(disposer)
    }

    /// Whether a pass started in `generation` may still touch the overlay.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_enabled() && self.generation == generation
    }

    /// Diff fetched records against what is rendered now.
    pub fn plan(&self, records: Vec<Record>) -> Reconciliation {
        reconcile(&self.rendered, records)
    }

    /// Record that the host accepted these additions.
    pub fn mark_added(&mut self, records: &[Record]) {
        for record in records {
            self.rendered.insert(record.id.clone());
        }
    }

    /// Record that the host accepted these removals.
    pub fn mark_removed(&mut self, ids: &[FeatureId]) {
        for id in ids {
            self.rendered.remove(id);
        }
    }
}
