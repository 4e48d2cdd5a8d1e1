//! Tracing setup for the server binary and log capture for tests.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const DEFAULT_FILTER: &str = "info,fourinrow_web=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Reads `FOURINROW_LOG_FORMAT`; anything other than `json` is pretty.
    pub fn from_env() -> Self {
        match std::env::var("FOURINROW_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(format: LogFormat) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(builder.with_thread_ids(true).finish())
        }
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Layer that records every event it sees.
///
/// Install it with `tracing::subscriber::set_default` on a current-thread
/// runtime so tasks spawned by the test are captured too.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.message.contains(needle))
            .collect()
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
                fields: visitor.fields,
            });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn captures_levels_and_fields() {
        let capture = LogCapture::new();
        let subscriber = Registry::default().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(game_id = "g1", "game started");
            tracing::warn!(participant = %"alice", "participant forfeited");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::INFO);
        assert_eq!(events[0].message, "game started");
        assert_eq!(events[0].field("game_id"), Some("g1"));
        assert_eq!(events[1].level, Level::WARN);
        assert_eq!(capture.matching("forfeited").len(), 1);
    }

    #[test]
    fn log_format_defaults_to_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
