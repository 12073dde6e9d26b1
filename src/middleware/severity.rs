use std::fmt;

use axum::http::StatusCode;

/// Outcome class of a finished request, derived from its status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// `[200, 300)`
    Success,
    /// `[300, 400)`
    Redirection,
    /// `[400, 500)`
    ClientError,
    /// `[500, 600)`
    ServerError,
    /// Anything else: 1xx, codes past 599, negatives.
    Unexpected,
}

/// Log importance, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Info,
    Warn,
    Error,
}

/// Maps a status code to exactly one [`Tier`].
///
/// Total over every `i32`; codes outside `[100, 599]` and informational
/// 1xx codes fall into [`Tier::Unexpected`].
pub fn classify(status: i32) -> Tier {
    match status {
        200..=299 => Tier::Success,
        300..=399 => Tier::Redirection,
        400..=499 => Tier::ClientError,
        500..=599 => Tier::ServerError,
        _ => Tier::Unexpected,
    }
}

impl Tier {
    pub fn severity(self) -> Severity {
        match self {
            Tier::Success | Tier::Redirection => Severity::Trace,
            Tier::ClientError => Severity::Warn,
            Tier::ServerError | Tier::Unexpected => Severity::Error,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Tier::Success => "Request completed",
            Tier::Redirection => "Request redirected",
            Tier::ClientError => "Bad request response",
            Tier::ServerError => "Server error response",
            Tier::Unexpected => "Unexpected status code",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Success => "success",
            Tier::Redirection => "redirection",
            Tier::ClientError => "client_error",
            Tier::ServerError => "server_error",
            Tier::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log entry describing a finished request.
///
/// Bodies are kept apart from the message so sinks can record them as
/// their own fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub tier: Tier,
    pub message: &'static str,
    pub request_id: String,
    pub client_ip: String,
    pub method: String,
    pub path: String,
    pub params: Option<String>,
    pub status: i32,
    /// `"200 OK"` style rendering of `status`.
    pub status_text: String,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    /// Set when the status fell outside every known range.
    pub unexpected_status: bool,
}

/// Inputs for [`build_entry`], borrowed from the request context.
#[derive(Debug, Clone, Copy)]
pub struct Outcome<'a> {
    pub request_id: &'a str,
    pub client_ip: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub params: Option<&'a str>,
    pub status: i32,
    pub request_body: Option<&'a [u8]>,
    pub response_body: Option<&'a [u8]>,
}

/// Classifies `outcome.status` and assembles the entry for it.
///
/// Empty bodies are left out of the entry.
pub fn build_entry(outcome: &Outcome<'_>, pretty: bool) -> LogEntry {
    let tier = classify(outcome.status);
    let attach = |body: Option<&[u8]>| {
        body.filter(|b| !b.is_empty())
            .map(|b| render_body(b, pretty))
    };

    LogEntry {
        severity: tier.severity(),
        tier,
        message: tier.message(),
        request_id: outcome.request_id.to_owned(),
        client_ip: outcome.client_ip.to_owned(),
        method: outcome.method.to_owned(),
        path: outcome.path.to_owned(),
        params: outcome.params.map(str::to_owned),
        status: outcome.status,
        status_text: status_text(outcome.status),
        request_body: attach(outcome.request_body),
        response_body: attach(outcome.response_body),
        unexpected_status: tier == Tier::Unexpected,
    }
}

/// Renders a captured body for logging.
///
/// With `pretty` set, JSON bodies are re-indented; anything that does not
/// parse is returned as the original text. Bodies that are not UTF-8 are
/// rendered with `\xNN` escapes so the exact bytes stay recoverable.
pub fn render_body(body: &[u8], pretty: bool) -> String {
    if pretty {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Ok(formatted) = serde_json::to_string_pretty(&value) {
                return formatted;
            }
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => text.to_owned(),
        Err(_) => body.escape_ascii().to_string(),
    }
}

fn status_text(status: i32) -> String {
    let reason = u16::try_from(status)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .and_then(|code| code.canonical_reason());

    match reason {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}
