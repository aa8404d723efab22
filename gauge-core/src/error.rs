//! Structured diagnostics for boundary consumers
//!
//! The engine only carries [`Status`] codes. Whatever sits on top of it (a
//! service, a CLI) turns those codes into a `Diagnostic` with a readable
//! message and a suggestion.

use crate::Status;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Request failed
    Error,
    /// Service cannot continue
    Fatal,
}

/// Structured, serializable error report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Machine-readable code (see [`Status::code`])
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Suggestion for fixing the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Unit expression or identifier the problem is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            subject: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set subject
    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Describe an engine status. `subject` is the text the status refers to.
    pub fn from_status(status: Status, subject: &str) -> Self {
        let base = Self::new(status.code(), status.to_string());
        let diag = match status {
            Status::SyntaxError => Self::new(
                status.code(),
                format!("Syntax error in unit expression '{}'", subject),
            )
            .with_suggestion("Use forms like 'km/h', 'm.s^-2', 'K @ 273.15' or 'lg(re 1 mW)' without surrounding spaces"),
            Status::UnknownIdentifier | Status::NoUnit => Self::new(
                status.code(),
                format!("Unknown unit: {}", subject),
            )
            .with_suggestion("Check spelling or use the 'list' method to see known names and symbols"),
            Status::Meaningless => Self::new(
                status.code(),
                format!("Operation is meaningless for {}", subject),
            )
            .with_suggestion("Offset, logarithmic and timestamp units cannot be multiplied, raised or rooted"),
            Status::NotSameSystem => base.with_suggestion("Obtain both units from the same unit-system"),
            Status::NoSecond => base.with_suggestion("Designate a time unit with set_second()"),
            Status::OpenArgument | Status::OpenEnvironment | Status::OpenDefault | Status::ParseError => {
                base.with_severity(Severity::Fatal)
            }
            _ => base,
        };
        if subject.is_empty() {
            diag
        } else {
            diag.about(subject)
        }
    }

    /// Two units have no conversion between them
    pub fn not_convertible(from: &str, to: &str) -> Self {
        Self::new(
            Status::Meaningless.code(),
            format!("Cannot convert from '{}' to '{}'", from, to),
        )
        .with_suggestion("Units must share a dimension; timestamps only convert to timestamps")
    }

    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(Status::BadArgument.code(), format!("Bad request: {}", details.into()))
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<Status> for Diagnostic {
    fn from(status: Status) -> Self {
        Self::from_status(status, "")
    }
}
