use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use std::fmt;

/// Severity level for diagnostics.
///
/// Neither level is fatal to extraction. `Error` means markup was dropped;
/// `Warning` means it was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Markup was discarded.
    Error,
    /// Markup was repaired or reinterpreted.
    Warning,
}

/// A note about malformed markup, located in the round buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How much was lost.
    pub severity: Severity,
    /// Byte range in the round's markup.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// Render diagnostics using ariadne for terminal output.
pub fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let (kind, color) = match diag.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };

        let span = (filename, diag.span.clone());
        Report::build(kind, span.clone())
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(&diag.message)
            .with_label(Label::new(span).with_message(&diag.message).with_color(color))
            .finish()
            .write((filename, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}
