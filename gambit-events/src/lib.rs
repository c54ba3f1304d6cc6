#![deny(missing_docs)]
//! # gambit-events — in-process event fan-out
//!
//! A single multicaster carries two classes of events: process lifecycle
//! events and interaction (LLM / tool-call) events. Dispatch is synchronous
//! on the caller's execution context; a listener that fails does not stop
//! dispatch to the others — the failure goes to the `tracing` diagnostic
//! channel and is swallowed.
//!
//! The bus holds only weak references to listeners, so unsubscribing (or
//! simply dropping a listener) is always safe. Events from the same process
//! reach each listener in the order they occurred; events across processes
//! have no defined ordering — listeners identify the source by `process_id`.

pub mod event;
pub mod log_listener;

pub use event::{AgentEvent, EventKind};
pub use log_listener::{TracingEventListener, TracingListenerConfig};

use gambit_types::{ProcessId, TokenUsage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;

/// Errors a listener may report. They are logged and swallowed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    /// The listener failed to handle the event.
    #[error("listener failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A consumer of agent events.
///
/// Dispatch is synchronous — handlers SHOULD complete quickly and must not
/// block on I/O. Listeners needing async work should enqueue internally.
pub trait EventListener: Send + Sync {
    /// Called for every published event, in publication order per process.
    fn on_event(&self, event: &AgentEvent) -> Result<(), EventError>;
}

/// The in-process multicaster.
///
/// Cheap to clone (all clones share the same listener list). Safe for
/// concurrent publication from multiple processes.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Weak<dyn EventListener>>>>,
}

impl EventBus {
    /// A bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Idempotent: registering the same `Arc` twice
    /// keeps a single registration.
    pub fn subscribe(&self, listener: &Arc<dyn EventListener>) {
        let mut listeners = self.listeners.lock().expect("listener list poisoned");
        let already = listeners
            .iter()
            .filter_map(Weak::upgrade)
            .any(|existing| Arc::ptr_eq(&existing, listener));
        if !already {
            listeners.push(Arc::downgrade(listener));
        }
    }

    /// Remove a listener. Removing one that was never registered is a no-op.
    pub fn unsubscribe(&self, listener: &Arc<dyn EventListener>) {
        let mut listeners = self.listeners.lock().expect("listener list poisoned");
        listeners.retain(|weak| match weak.upgrade() {
            Some(existing) => !Arc::ptr_eq(&existing, listener),
            None => false,
        });
    }

    /// Deliver `event` to every live listener, in registration order.
    ///
    /// Listener failures are logged and swallowed; dead weak references are
    /// pruned as a side effect.
    pub fn publish(&self, event: &AgentEvent) {
        let live: Vec<Arc<dyn EventListener>> = {
            let mut listeners = self.listeners.lock().expect("listener list poisoned");
            listeners.retain(|weak| weak.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            if let Err(e) = listener.on_event(event) {
                tracing::warn!(
                    process_id = %event.process_id,
                    error = %e,
                    "event listener failed; continuing dispatch"
                );
            }
        }
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .expect("listener list poisoned")
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// Per-process event source.
///
/// Stamps every event with the owning process's ID and a monotone sequence
/// number (the process's logical clock), tallies LLM token spend as a side
/// effect, and keeps the process-local event history for the final report.
#[derive(Clone)]
pub struct ProcessEmitter {
    bus: EventBus,
    process_id: ProcessId,
    seq: Arc<AtomicU64>,
    spend: Arc<Mutex<TokenUsage>>,
    history: Arc<Mutex<Vec<AgentEvent>>>,
}

impl ProcessEmitter {
    /// An emitter publishing onto `bus` for `process_id`.
    #[must_use]
    pub fn new(bus: EventBus, process_id: ProcessId) -> Self {
        Self {
            bus,
            process_id,
            seq: Arc::new(AtomicU64::new(0)),
            spend: Arc::new(Mutex::new(TokenUsage::default())),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The owning process's ID.
    #[must_use]
    pub fn process_id(&self) -> &ProcessId {
        &self.process_id
    }

    /// Stamp and publish an event.
    pub fn emit(&self, kind: EventKind) {
        if let EventKind::LlmResponse { usage, .. } = &kind {
            self.spend
                .lock()
                .expect("spend tally poisoned")
                .accumulate(usage);
        }
        let event = AgentEvent {
            process_id: self.process_id.clone(),
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            kind,
        };
        self.history
            .lock()
            .expect("event history poisoned")
            .push(event.clone());
        self.bus.publish(&event);
    }

    /// Cumulative LLM token spend observed through this emitter.
    #[must_use]
    pub fn spend(&self) -> TokenUsage {
        *self.spend.lock().expect("spend tally poisoned")
    }

    /// Every event emitted so far, in order.
    #[must_use]
    pub fn history(&self) -> Vec<AgentEvent> {
        self.history.lock().expect("event history poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gambit_types::TokenUsage;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
    }

    impl EventListener for Recorder {
        fn on_event(&self, event: &AgentEvent) -> Result<(), EventError> {
            self.seen.lock().unwrap().push(event.seq);
            Ok(())
        }
    }

    struct FailingListener;

    impl EventListener for FailingListener {
        fn on_event(&self, _event: &AgentEvent) -> Result<(), EventError> {
            Err(EventError::Failed("always".into()))
        }
    }

    fn emitter(bus: &EventBus) -> ProcessEmitter {
        ProcessEmitter::new(bus.clone(), ProcessId::new("p-1"))
    }

    #[test]
    fn subscribe_is_idempotent() {
        let bus = EventBus::new();
        let listener: Arc<dyn EventListener> = Arc::new(Recorder::default());
        bus.subscribe(&listener);
        bus.subscribe(&listener);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let bus = EventBus::new();
        let listener: Arc<dyn EventListener> = Arc::new(Recorder::default());
        bus.unsubscribe(&listener);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn events_are_ordered_per_listener() {
        let bus = EventBus::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let a_dyn: Arc<dyn EventListener> = a.clone();
        let b_dyn: Arc<dyn EventListener> = b.clone();
        bus.subscribe(&a_dyn);
        bus.subscribe(&b_dyn);

        let emitter = emitter(&bus);
        emitter.emit(EventKind::ProcessCreated { agent: "x".into() });
        emitter.emit(EventKind::ActionStarted { action: "a1".into() });
        emitter.emit(EventKind::ProcessCompleted);

        let a_seen = a.seen.lock().unwrap().clone();
        let b_seen = b.seen.lock().unwrap().clone();
        assert_eq!(a_seen, vec![0, 1, 2]);
        assert_eq!(a_seen, b_seen);
    }

    #[test]
    fn failing_listener_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let failing: Arc<dyn EventListener> = Arc::new(FailingListener);
        let ok = Arc::new(Recorder::default());
        let ok_dyn: Arc<dyn EventListener> = ok.clone();
        bus.subscribe(&failing);
        bus.subscribe(&ok_dyn);

        emitter(&bus).emit(EventKind::ProcessCompleted);
        assert_eq!(ok.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let bus = EventBus::new();
        {
            let listener: Arc<dyn EventListener> = Arc::new(Recorder::default());
            bus.subscribe(&listener);
            assert_eq!(bus.listener_count(), 1);
        }
        emitter(&bus).emit(EventKind::ProcessCompleted);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn emitter_tallies_llm_spend() {
        let bus = EventBus::new();
        let emitter = emitter(&bus);
        emitter.emit(EventKind::LlmResponse {
            interaction: "i-1".into(),
            elapsed_ms: 5,
            usage: TokenUsage::new(10, 4),
        });
        emitter.emit(EventKind::LlmResponse {
            interaction: "i-2".into(),
            elapsed_ms: 7,
            usage: TokenUsage::new(1, 1),
        });
        assert_eq!(emitter.spend(), TokenUsage::new(11, 5));
        assert_eq!(emitter.history().len(), 2);
    }
}
