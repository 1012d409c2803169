//! Log transport setup
//!
//! Diagnostics go through `tracing`. The agent usually runs from a process
//! scheduler with no terminal attached, so the default transport is the
//! local syslog daemon (RFC 3164, carrying the process name and pid); a
//! stderr layer is used when syslog is disabled or unreachable.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Mutex;

use syslog::{Facility, Formatter3164, LoggerBackend};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global tracing subscriber according to `config`.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "pagerelay={level},pagerelay_agent={level}",
            level = config.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_to_syslog {
        match SyslogLayer::for_local_daemon() {
            Ok(layer) => {
                registry.with(layer).init();
                return;
            }
            Err(e) => {
                registry
                    .with(tracing_subscriber::fmt::layer().with_target(false))
                    .init();
                tracing::warn!("syslog unavailable, logging to stderr: {e}");
                return;
            }
        }
    }

    registry
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Forwards tracing events to the local syslog daemon.
pub struct SyslogLayer {
    logger: Mutex<syslog::Logger<LoggerBackend, Formatter3164>>,
}

impl SyslogLayer {
    /// Connect to the local syslog socket. Every line carries the process
    /// identity as `pagerelay[<pid>]`.
    pub fn for_local_daemon() -> Result<Self, syslog::Error> {
        let formatter = Formatter3164 {
            facility: Facility::LOG_USER,
            hostname: hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().to_string()),
            process: "pagerelay".to_string(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter)?;
        Ok(Self {
            logger: Mutex::new(logger),
        })
    }
}

impl<S: Subscriber> Layer<S> for SyslogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.finish();

        let Ok(mut logger) = self.logger.lock() else {
            return;
        };
        let level = *event.metadata().level();
        let result = if level == Level::ERROR {
            logger.err(&message)
        } else if level == Level::WARN {
            logger.warning(&message)
        } else if level == Level::INFO {
            logger.info(&message)
        } else {
            logger.debug(&message)
        };
        // Nothing sensible to do if the syslog socket went away mid-run.
        let _ = result;
    }
}

/// Collects an event's fields into a single syslog line: the message first,
/// remaining fields appended as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut line = self.message;
        line.push_str(&self.fields);
        line
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
