//! Incremental narrative markup extraction for tale.
//!
//! Markup arrives in arbitrary fragments. [`MarkupExtractor`] scans the
//! growing buffer and emits complete units as soon as their closing tag is
//! seen; [`RoundAssembler`] turns those units into ordered
//! [`Segment`](tale_core::Segment)s. Malformed markup never fails extraction,
//! it is skipped and reported as a [`Diagnostic`].

/// Segment assembly and per-round state.
pub mod assembler;
/// Diagnostics for malformed markup.
pub mod diagnostics;
/// The streaming extraction state machine.
pub mod extractor;
/// Tag-level lexer.
pub mod lexer;
/// Tag-level parser.
pub mod parser;

pub use assembler::{AssembledRound, RoundAssembler, assemble, assemble_unit};
pub use diagnostics::{Diagnostic, Severity, render_diagnostics};
pub use extractor::{ExtractedUnit, ExtractorState, MarkupExtractor, extract_units};

/// Extract the segments of a complete markup string in one pass.
///
/// Equivalent to streaming the whole string as a single fragment and then
/// completing the round.
pub fn extract_segments(markup: &str) -> AssembledRound {
    let mut round = RoundAssembler::new();
    round.push(markup);
    round.finish()
}

impl AssembledRound {
    /// Whether any markup had to be dropped.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}
