//! Small supporting utilities: chain id generation, timestamps, and the
//! `%s` placeholder substitution used to build log record content.

use chrono::{SecondsFormat, Utc};
use std::fmt::Display;
use uuid::Uuid;

/// Generates a fresh chain id. One id is minted per top-level call chain
/// and inherited by every child and transfer within it.
pub(crate) fn chain_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time as an ISO-8601 / RFC 3339 string (UTC,
/// millisecond precision).
pub(crate) fn isotime() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Substitutes `args` positionally into `%s` placeholders in `fmt`.
///
/// This is deliberately not a full format-string language: only `%s` is
/// recognized, placeholders without a matching argument are left
/// verbatim, and surplus arguments are ignored.
pub(crate) fn interpolate(fmt: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(fmt.len());
    let mut rest = fmt;
    let mut next = 0;

    while let Some(pos) = rest.find("%s") {
        if next >= args.len() {
            break;
        }
        out.push_str(&rest[..pos]);
        out.push_str(&args[next].to_string());
        next += 1;
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}
