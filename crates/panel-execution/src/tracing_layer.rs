//! Tracing layer that streams pipeline log events to a channel.
//!
//! Installed next to the regular formatter, it turns every event whose
//! target starts with the configured prefix into a serializable
//! [`RunEvent`] so a front end can follow a run live.

use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

pub const DEFAULT_TARGET_PREFIX: &str = "panel";

/// Event data sent to the receiver.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunEvent {
    /// Event target (e.g., "panel_execution::scheduler")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub message: String,
    /// Structured fields other than the message
    pub fields: Map<String, Value>,
    /// Name of the innermost span, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

pub struct RunEventLayer {
    sender: mpsc::UnboundedSender<RunEvent>,
    target_prefix: String,
}

impl RunEventLayer {
    /// Create a new layer forwarding `panel*` events to `sender`.
    pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self {
            sender,
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
        }
    }

    pub fn with_target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = prefix.into();
        self
    }

    /// Creates a layer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for RunEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(&self.target_prefix) {
            return;
        }

        let mut fields = Map::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.shift_remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let span = ctx
            .event_span(event)
            .map(|span| span.name().to_string());

        let run_event = RunEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(run_event);
    }
}

/// Field visitor that extracts tracing event fields into a JSON map
struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), json!(format!("{:?}", value)));
    }
}
