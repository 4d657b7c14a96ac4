//! Typed pipeline notifications
//!
//! A closed set of event kinds with fixed payload shapes. Payloads carry
//! names, counters and already-redacted error messages; never the
//! execution context itself.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Notification names observers can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PipelineStart,
    StepStart,
    StepComplete,
    StepError,
    StepRetry,
    PipelineComplete,
    PipelineError,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PipelineEvent {
    PipelineStart {
        execution_id: String,
        strategy: String,
        steps: Vec<String>,
    },
    StepStart {
        execution_id: String,
        step: String,
        index: usize,
    },
    StepComplete {
        execution_id: String,
        step: String,
        duration_ms: u64,
        attempts: u32,
    },
    StepError {
        execution_id: String,
        step: String,
        error: String,
        attempts: u32,
        optional: bool,
    },
    StepRetry {
        execution_id: String,
        step: String,
        /// 1 for the first retry
        retry: u32,
        max_retries: u32,
        delay_ms: u64,
        error: String,
    },
    PipelineComplete {
        execution_id: String,
        duration_ms: u64,
        completed_steps: Vec<String>,
        failed_steps: Vec<String>,
    },
    PipelineError {
        execution_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<String>,
        error: String,
    },
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::PipelineStart { .. } => EventKind::PipelineStart,
            PipelineEvent::StepStart { .. } => EventKind::StepStart,
            PipelineEvent::StepComplete { .. } => EventKind::StepComplete,
            PipelineEvent::StepError { .. } => EventKind::StepError,
            PipelineEvent::StepRetry { .. } => EventKind::StepRetry,
            PipelineEvent::PipelineComplete { .. } => EventKind::PipelineComplete,
            PipelineEvent::PipelineError { .. } => EventKind::PipelineError,
        }
    }

    pub fn execution_id(&self) -> &str {
        match self {
            PipelineEvent::PipelineStart { execution_id, .. }
            | PipelineEvent::StepStart { execution_id, .. }
            | PipelineEvent::StepComplete { execution_id, .. }
            | PipelineEvent::StepError { execution_id, .. }
            | PipelineEvent::StepRetry { execution_id, .. }
            | PipelineEvent::PipelineComplete { execution_id, .. }
            | PipelineEvent::PipelineError { execution_id, .. } => execution_id,
        }
    }
}

/// Handle returned by `on`/`once`, used with `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    once: bool,
    listener: Listener,
}

/// Publish/subscribe hub shared by every execution of a pipeline
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, false, Arc::new(listener))
    }

    /// Subscribe to the next event of `kind` only
    pub fn once<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, true, Arc::new(listener))
    }

    /// Remove a subscription; `false` if it was already gone
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|s| s.kind == kind).count()
    }

    /// Deliver an event. Listeners run outside the lock, so they may
    /// subscribe or unsubscribe.
    pub fn emit(&self, event: &PipelineEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = {
            let mut subs = self.lock();
            let matching = subs
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| s.listener.clone())
                .collect();
            subs.retain(|s| !(s.once && s.kind == kind));
            matching
        };
        for listener in listeners {
            listener(event);
        }
    }

    fn subscribe(&self, kind: EventKind, once: bool, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Subscription {
            id,
            kind,
            once,
            listener,
        });
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn start() -> PipelineEvent {
        PipelineEvent::StepStart {
            execution_id: "e".into(),
            step: "s".into(),
            index: 0,
        }
    }

    #[test]
    fn test_on_and_off() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = bus.on(EventKind::StepStart, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&start());
        bus.emit(&start());
        assert!(bus.off(id));
        bus.emit(&start());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!bus.off(id));
    }

    #[test]
    fn test_once() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.once(EventKind::StepStart, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&start());
        bus.emit(&start());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventKind::StepStart), 0);
    }

    #[test]
    fn test_kind_filter() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.on(EventKind::PipelineError, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(&start());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(start()).unwrap();
        assert_eq!(json["event"], "step-start");
        assert_eq!(json["step"], "s");
    }
}
