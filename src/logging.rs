use std::fmt;
use std::io::IsTerminal;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::types::LogFormat;

/// Custom tracing formatter that prepends colored [PROBE]/[DENY]/[ALLOW]
/// prefixes to log events based on message content, and colorizes known
/// field names.
pub struct PrefixedFormatter<E> {
    inner: E,
    ansi: bool,
}

impl<E> PrefixedFormatter<E> {
    pub fn new(inner: E, ansi: bool) -> Self {
        Self { inner, ansi }
    }
}

impl<S, N, E> FormatEvent<S, N> for PrefixedFormatter<E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    E: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);
        let msg_lower = visitor.message.to_lowercase();

        if let Some((tag, color)) = classify(&msg_lower) {
            if self.ansi {
                write!(writer, "\x1b[{}m[{}]\x1b[0m ", color, tag)?;
            } else {
                write!(writer, "[{}] ", tag)?;
            }
        }

        // Delegate to the inner formatter, then post-process the output
        // to colorize known field names when ANSI is enabled.
        if self.ansi {
            // Write to a temporary buffer so we can colorize fields
            let mut buf = String::new();
            let buf_writer = Writer::new(&mut buf);
            self.inner.format_event(ctx, buf_writer, event)?;
            let colorized = colorize_fields(&buf);
            write!(writer, "{}", colorized)?;
            Ok(())
        } else {
            self.inner.format_event(ctx, writer, event)
        }
    }
}

/// Colorize known field names in a log line.
/// Uses ANSI codes: yellow=probe input, magenta=peer/addr, dim=conn_id,
/// green=totals, red=error/reason.
fn colorize_fields(line: &str) -> String {
    let mut result = line.to_string();
    for (field, color) in FIELD_COLORS {
        let pattern = format!("{}=", field);
        if result.contains(&pattern) {
            let colored = format!("\x1b[{}m{}=\x1b[0m", color, field);
            result = result.replace(&pattern, &colored);
        }
    }
    result
}

/// Field name → ANSI color code mapping.
const FIELD_COLORS: &[(&str, &str)] = &[
    // yellow (33): what the prober sent
    ("command", "33"),
    ("argument", "33"),
    ("line", "33"),
    ("queue", "33"),
    // magenta (35): network addresses
    ("peer", "35"),
    ("addr", "35"),
    // dim (2): correlation
    ("conn_id", "2"),
    // green (32): session totals
    ("bytes", "32"),
    ("duration_ms", "32"),
    // red (31): errors
    ("error", "31"),
    ("reason", "31"),
];

/// Visitor that extracts the message field from a tracing event.
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// Tag and ANSI color for a lower-cased log message, if it is notable.
fn classify(msg: &str) -> Option<(&'static str, &'static str)> {
    if is_deny_pattern(msg) {
        Some(("DENY", "31"))
    } else if is_allow_pattern(msg) {
        Some(("ALLOW", "34"))
    } else if is_probe_pattern(msg) {
        Some(("PROBE", "33"))
    } else {
        None
    }
}

fn is_deny_pattern(msg: &str) -> bool {
    msg.contains("auth failed") || msg.contains("rejected") || msg.contains("read failed")
}

fn is_allow_pattern(msg: &str) -> bool {
    msg.contains("auth success")
}

fn is_probe_pattern(msg: &str) -> bool {
    msg.contains("command received")
        || msg.contains("job received")
        || msg.contains("list requested")
        || msg.contains("command ignored")
}

/// Initialize the global tracing subscriber.
///
/// In Pretty mode, wraps the default formatter with `PrefixedFormatter`
/// to prepend colored tags and colorize field names. JSON mode is unchanged.
/// This is operational logging only; audit records go through the
/// [`AuditLogger`](crate::audit::AuditLogger) handle.
pub fn setup_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Pretty => {
            let ansi = std::io::stdout().is_terminal();
            let default_format = tracing_subscriber::fmt::format::Format::default();
            tracing_subscriber::fmt()
                .event_format(PrefixedFormatter::new(default_format, ansi))
                .with_env_filter(filter)
                .init();
        }
    }
}
