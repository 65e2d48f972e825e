//! Subscription lifecycle: register while enabled, tear down exactly once.

use std::panic::{catch_unwind, AssertUnwindSafe};

use mapsync_core::{Disposer, Error, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// Two-state overlay machine. Only toggle events move it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    #[default]
    Disabled,
    Enabled,
}

/// Outcome of draining the subscription registry.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Number of disposers invoked.
    pub disposed: usize,
    /// Errors from disposers that failed or panicked.
    pub failures: Vec<Error>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the subscriptions created during one enable period.
pub struct LifecycleManager {
    state: OverlayState,
    registry: Vec<Disposer>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            state: OverlayState::Disabled,
            registry: Vec::new(),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == OverlayState::Enabled
    }

    /// Number of outstanding subscriptions.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Enter the enabled state. Returns false if already enabled.
    pub fn enable(&mut self) -> bool {
        if self.is_enabled() {
            return false;
        }
        self.state = OverlayState::Enabled;
        true
    }

    /// Enter the disabled state and tear everything down.
    ///
    /// Returns `None` if already disabled.
    pub fn disable(&mut self) -> Option<TeardownReport> {
        if !self.is_enabled() {
            return None;
        }
        self.state = OverlayState::Disabled;
        Some(self.teardown_all())
    }

    /// Track a disposer for the current enable period.
    ///
    /// While disabled there is no period to attach it to: the disposer runs
    /// immediately and a precondition error is returned.
    pub fn register(&mut self, disposer: Disposer) -> Result<()> {
        if !self.is_enabled() {
            warn!("Subscription registered while overlay is disabled; disposing it");
            if let Err(e) = run_disposer(disposer) {
                debug!("Immediate dispose failed: {}", e);
            }
            return Err(Error::Precondition(
                "register called while overlay is disabled".into(),
            ));
        }
        self.registry.push(disposer);
        Ok(())
    }

    /// Invoke every disposer once, in registration order.
    ///
    /// Failures are collected, never propagated; the registry is always left
    /// empty.
    pub fn teardown_all(&mut self) -> TeardownReport {
        let registry = std::mem::take(&mut self.registry);
        let report = registry
            .into_iter()
            .fold(TeardownReport::default(), |mut report, disposer| {
                report.disposed += 1;
                if let Err(e) = run_disposer(disposer) {
                    report.failures.push(e);
                }
                report
            });

        if !report.is_clean() {
            debug!(
                "Teardown finished with {}/{} failures",
                report.failures.len(),
                report.disposed
            );
        }
        report
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            let report = self.teardown_all();
            for failure in &report.failures {
                warn!("Teardown on drop: {}", failure);
            }
        }
    }
}

fn run_disposer(disposer: Disposer) -> Result<()> {
    catch_unwind(AssertUnwindSafe(disposer)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "disposer panicked".into());
        Err(Error::Subscription(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting(counter: &Arc<AtomicUsize>) -> Disposer {
        let counter = counter.clone();
        Box::new(move || -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_starts_disabled() {
        let mgr = LifecycleManager::new();
        assert_eq!(mgr.state(), OverlayState::Disabled);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_teardown_runs_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut mgr = LifecycleManager::new();
        mgr.enable();
        for i in 0..3 {
            let order = order.clone();
            mgr.register(Box::new(move || -> Result<()> {
                order.lock().unwrap().push(i);
                Ok(())
            }))
            .unwrap();
        }

        let report = mgr.teardown_all();
        assert_eq!(report.disposed, 3);
        assert!(report.is_clean());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_failing_disposer_does_not_stop_the_rest() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mgr = LifecycleManager::new();
        mgr.enable();
        mgr.register(counting(&counter)).unwrap();
        mgr.register(Box::new(|| -> Result<()> { Err(Error::Subscription("gone".into())) }))
            .unwrap();
        mgr.register(counting(&counter)).unwrap();

        let report = mgr.teardown_all();
        assert_eq!(report.disposed, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_panicking_disposer_is_collected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mgr = LifecycleManager::new();
        mgr.enable();
        mgr.register(Box::new(|| -> Result<()> { panic!("handler vanished") })).unwrap();
        mgr.register(counting(&counter)).unwrap();

        let report = mgr.teardown_all();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].to_string().contains("handler vanished"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_all_failing_still_clears_registry() {
        let mut mgr = LifecycleManager::new();
        mgr.enable();
        for _ in 0..4 {
            mgr.register(Box::new(|| -> Result<()> { Err(Error::Subscription("x".into())) }))
                .unwrap();
        }
        let report = mgr.teardown_all();
        assert_eq!(report.failures.len(), 4);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_teardown_on_empty_is_noop() {
        let mut mgr = LifecycleManager::new();
        let report = mgr.teardown_all();
        assert_eq!(report.disposed, 0);
        assert!(report.is_clean());

        let again = mgr.teardown_all();
        assert_eq!(again.disposed, 0);
    }

    #[test]
    fn test_disposers_run_exactly_once_across_cycles() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mgr = LifecycleManager::new();

        for _ in 0..3 {
            assert!(mgr.enable());
            mgr.register(counting(&counter)).unwrap();
            mgr.register(counting(&counter)).unwrap();
            let report = mgr.disable().unwrap();
            assert_eq!(report.disposed, 2);
        }
        assert!(mgr.disable().is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_enable_twice_is_noop() {
        let mut mgr = LifecycleManager::new();
        assert!(mgr.enable());
        assert!(!mgr.enable());
        assert_eq!(mgr.state(), OverlayState::Enabled);
    }

    #[test]
    fn test_register_while_disabled_disposes_and_errors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mgr = LifecycleManager::new();
        let err = mgr.register(counting(&counter)).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_drop_tears_down_outstanding() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut mgr = LifecycleManager::new();
            mgr.enable();
            mgr.register(counting(&counter)).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
