//! Layer `tracing` qui recopie chaque événement dans le [`LogState`]

use super::{LogEntry, LogState};
use chrono::Utc;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Layer alimentant le buffer circulaire et le canal de diffusion
#[derive(Clone)]
pub struct BufferLayer {
    state: LogState,
}

impl BufferLayer {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.state.push(LogEntry {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Récupère le champ `message` et ajoute les autres champs en `clé=valeur`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_reach_the_buffer() {
        let state = LogState::new(8);
        let subscriber = tracing_subscriber::registry().with(BufferLayer::new(state.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(key = "methods-all", "Cache hit");
            tracing::warn!("Source {} failed", "alpha");
        });

        let entries = state.dump();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(entries[0].message, "Cache hit key=methods-all");
        assert_eq!(entries[1].level, "WARN");
        assert_eq!(entries[1].message, "Source alpha failed");
    }
}
