//! # Log Records
//!
//! The structured record shape handed to every [`LogRecorder`], plus the
//! render templates recorders use to turn a record into one output line.
//!
//! A record carries everything needed to correlate a line with its call
//! chain: the chain `id`, the `service` that emitted it, and `uptime`
//! milliseconds since that context started.
//!
//! [`LogRecorder`]: crate::recorder::LogRecorder

use serde::Serialize;

/// Severity/kind tag of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Log,
    Info,
    Debug,
    Error,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordKind::Log => "log",
            RecordKind::Info => "info",
            RecordKind::Debug => "debug",
            RecordKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// One structured log record emitted by a context.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// ISO-8601 timestamp of emission.
    pub time: String,
    /// Chain id shared by every record of one external call.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Name of the service executing when the record was emitted.
    pub service: String,
    /// Milliseconds since the emitting context's own start time.
    pub uptime: u64,
    pub content: String,
}

/// How a recorder renders a [`LogRecord`] into a line.
///
/// `Custom` supports the `$time`/`$isotime`, `$id`, `$type`, `$service`,
/// `$uptime` and `$content` tokens; unknown tokens stay verbatim.
#[derive(Debug, Clone, Default)]
pub enum RecordTemplate {
    /// Structured JSON object, one per line.
    #[default]
    Json,
    /// Tab-delimited plain text: time, type, id, service, uptime, content.
    Text,
    Custom(String),
}

impl RecordTemplate {
    pub fn render(&self, record: &LogRecord) -> String {
        match self {
            RecordTemplate::Json => {
                serde_json::to_string(record).unwrap_or_else(|_| String::new())
            }
            RecordTemplate::Text => format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                record.time, record.kind, record.id, record.service, record.uptime, record.content
            ),
            RecordTemplate::Custom(fmt) => render_custom(fmt, record),
        }
    }
}

/// Single left-to-right scan over the template. Each `$token` in the
/// template text is looked up exactly once, so field values containing
/// token-shaped text pass through untouched.
fn render_custom(fmt: &str, record: &LogRecord) -> String {
    // `$isotime` is the historical alias for `$time`; listed first so the
    // longest match wins.
    let tokens: [(&str, String); 7] = [
        ("$isotime", record.time.clone()),
        ("$time", record.time.clone()),
        ("$id", record.id.clone()),
        ("$type", record.kind.to_string()),
        ("$service", record.service.clone()),
        ("$uptime", record.uptime.to_string()),
        ("$content", record.content.clone()),
    ];

    let mut out = String::with_capacity(fmt.len());
    let mut rest = fmt;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match tokens.iter().find(|(name, _)| rest.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &rest[name.len()..];
            }
            None => {
                // Unknown tokens stay verbatim.
                out.push('$');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
