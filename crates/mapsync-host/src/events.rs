//! In-process host event bus.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use mapsync_core::{Disposer, Error, EventKind, HostEvent, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::debug;

use crate::host::{EventHandler, EventSource, NextEvent};

struct BusInner {
    next_id: Mutex<u64>,
    handlers: RwLock<HashMap<EventKind, Vec<(u64, EventHandler)>>>,
    waiters: Mutex<HashMap<EventKind, Vec<oneshot::Sender<HostEvent>>>>,
}

impl BusInner {
    fn unsubscribe(&self, kind: EventKind, id: u64) -> Result<()> {
        let mut handlers = self.handlers.write();
        let list = handlers.entry(kind).or_default();
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        if list.len() == before {
            return Err(Error::Subscription(format!(
                "subscription {} to {} is not active",
                id, kind
            )));
        }
        Ok(())
    }
}

/// Event bus with subscribe/once/emit semantics.
///
/// Handlers run outside the bus locks, so a handler may subscribe,
/// unsubscribe or emit without deadlocking. Cloning shares the bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: Mutex::new(0),
                handlers: RwLock::new(HashMap::new()),
                waiters: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Deliver `event` to every handler and pending waiter for its kind.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: HostEvent) -> usize {
        let kind = event.kind();

        let waiters = self.inner.waiters.lock().remove(&kind).unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(event.clone());
        }

        let handlers: Vec<EventHandler> = self
            .inner
            .handlers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        debug!("Emitting {} to {} handlers", kind, handlers.len());
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    /// Number of live handlers for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner
            .handlers
            .read()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Disposer {
        let id = {
            let mut next = self.inner.next_id.lock();
            *next += 1;
            *next
        };
        self.inner
            .handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, handler));

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        Box::new(move || -> Result<()> {
            let inner = bus
                .upgrade()
                .ok_or_else(|| Error::Subscription("event bus is gone".into()))?;
            inner.unsubscribe(kind, id)
        })
    }

    fn subscribe_once(&self, kind: EventKind) -> NextEvent {
        let (tx, rx) = oneshot::channel();
        self.inner.waiters.lock().entry(kind).or_default().push(tx);
        Box::pin(async move {
            rx.await
                .map_err(|_| Error::Subscription(format!("event bus closed before {}", kind)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsync_core::ToggleEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
        let counter = counter.clone();
        Arc::new(move |_: &HostEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_matching_kind() {
        let bus = EventBus::new();
        let moves = Arc::new(AtomicUsize::new(0));
        let _dispose = bus.subscribe(EventKind::MapMoveEnd, counter_handler(&moves));

        assert_eq!(bus.emit(HostEvent::MapMoveEnd), 1);
        assert_eq!(bus.emit(HostEvent::Ready), 0);
        assert_eq!(moves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disposer_unsubscribes() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let dispose = bus.subscribe(EventKind::MapMoveEnd, counter_handler(&hits));
        assert_eq!(bus.handler_count(EventKind::MapMoveEnd), 1);

        dispose().unwrap();
        assert_eq!(bus.handler_count(EventKind::MapMoveEnd), 0);
        bus.emit(HostEvent::MapMoveEnd);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disposer_fails_when_bus_dropped() {
        let bus = EventBus::new();
        let dispose = bus.subscribe(EventKind::Ready, Arc::new(|_: &HostEvent| {}));
        drop(bus);
        assert!(matches!(dispose(), Err(Error::Subscription(_))));
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let handler: EventHandler = {
            let slot = slot.clone();
            let hits = hits.clone();
            Arc::new(move |_: &HostEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
                if let Some(dispose) = slot.lock().take() {
                    dispose().unwrap();
                }
            })
        };
        *slot.lock() = Some(bus.subscribe(EventKind::MapMoveEnd, handler));

        bus.emit(HostEvent::MapMoveEnd);
        bus.emit(HostEvent::MapMoveEnd);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribe_once_resolves_on_next_event() {
        let bus = EventBus::new();
        let ready = bus.subscribe_once(EventKind::Ready);
        bus.emit(HostEvent::CheckboxToggled(ToggleEvent {
            name: "x".into(),
            checked: true,
        }));
        bus.emit(HostEvent::Ready);
        assert_eq!(ready.await.unwrap(), HostEvent::Ready);
        assert!(bus.inner.waiters.lock().get(&EventKind::Ready).is_none());
    }

    fn next_ready<E: EventSource>(
        events: &E,
    ) -> impl std::future::Future<Output = Result<HostEvent>> + Send + 'static {
        events.subscribe_once(EventKind::Ready)
    }

    #[tokio::test]
    async fn test_subscribe_once_outlives_borrow() {
        let bus = EventBus::new();
        let waiter = tokio::spawn(next_ready(&bus));
        bus.emit(HostEvent::Ready);
        assert_eq!(waiter.await.unwrap().unwrap(), HostEvent::Ready);
    }

    #[tokio::test]
    async fn test_subscribe_once_errors_when_bus_dropped() {
        let bus = EventBus::new();
        let ready = bus.subscribe_once(EventKind::Ready);
        drop(bus);
        assert!(ready.await.is_err());
    }
}
