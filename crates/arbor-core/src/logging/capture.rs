//! Test helper: record tracing events in memory and assert on them.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Module path that emitted it.
    pub target: String,
    /// The `message` field.
    pub message: String,
    /// Every other field, rendered, in record order.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Rendered value of field `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    fn push(&mut self, field: &Field, rendered: String) {
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_owned(), rendered));
        }
    }
}

impl Visit for CapturedEvent {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// Handle to the events recorded since [`capture_logs`] was called.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    fn with<R>(&self, f: impl FnOnce(&[CapturedEvent]) -> R) -> R {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        f(&events)
    }

    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.with(<[CapturedEvent]>::to_vec)
    }

    /// Whether an event at `level` has a message containing `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.with(|events| events.iter().any(|e| e.level == level && e.message.contains(needle)))
    }

    /// How many events were recorded at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.with(|events| events.iter().filter(|e| e.level == level).count())
    }
}

struct Recorder(CapturedLogs);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut captured = CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut captured);
        self.0
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
    }
}

/// Record every event on the current thread until the guard drops.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(Recorder(logs.clone()))
        .set_default();
    (logs, guard)
}
