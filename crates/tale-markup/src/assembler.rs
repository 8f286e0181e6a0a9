//! Turns extracted units into the ordered segment list for one round.
//!
//! Within a character block the i-th `<say>` pairs with the i-th `<action>`.
//! Lines past the last action get the neutral expression and no action;
//! actions past the last line are dropped.

use tale_core::{CharacterLine, NEUTRAL_EXPRESSION, Segment};

use crate::diagnostics::Diagnostic;
use crate::extractor::{CharacterBlock, ExtractedUnit, MarkupExtractor};

/// Convert one unit into zero or more segments.
pub fn assemble_unit(unit: ExtractedUnit) -> Vec<Segment> {
    match unit {
        ExtractedUnit::Narration { text, .. } => Segment::narration(&text).into_iter().collect(),
        ExtractedUnit::Character(block) => assemble_block(block),
    }
}

/// Convert units into segments, preserving their order.
pub fn assemble(units: impl IntoIterator<Item = ExtractedUnit>) -> Vec<Segment> {
    units.into_iter().flat_map(assemble_unit).collect()
}

fn assemble_block(block: CharacterBlock) -> Vec<Segment> {
    let CharacterBlock {
        name,
        actions,
        lines,
        ..
    } = block;

    if actions.len() > lines.len() {
        tracing::debug!(
            name = name.as_deref().unwrap_or(""),
            dropped = actions.len() - lines.len(),
            "actions without dialogue dropped"
        );
    }

    let name = name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let mut actions = actions.into_iter();

    lines
        .into_iter()
        .filter_map(|line| {
            let action = actions.next();
            let Some(name) = name else {
                return Segment::narration(&line);
            };
            let (expression, action_text) = match &action {
                Some(a) => (
                    a.expression.as_deref().unwrap_or(NEUTRAL_EXPRESSION),
                    a.text.as_str(),
                ),
                None => (NEUTRAL_EXPRESSION, ""),
            };
            CharacterLine::new(name, expression, &line)
                .map(|l| Segment::Character(l.with_action(action_text)))
        })
        .collect()
}

/// Working state for one round: the extractor plus the segments assembled
/// so far.
#[derive(Debug, Default)]
pub struct RoundAssembler {
    extractor: MarkupExtractor,
    segments: Vec<Segment>,
}

/// The finalized output of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRound {
    /// Segments in source order.
    pub segments: Vec<Segment>,
    /// The round's full markup.
    pub markup: String,
    /// Malformed-markup notes.
    pub diagnostics: Vec<Diagnostic>,
}

impl RoundAssembler {
    /// Start a new round with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fragment, returning the segments it completed.
    pub fn push(&mut self, fragment: &str) -> &[Segment] {
        let before = self.segments.len();
        let units = self.extractor.push(fragment);
        self.absorb(units);
        &self.segments[before..]
    }

    /// Segments assembled so far.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The round's markup received so far.
    pub fn markup(&self) -> &str {
        self.extractor.markup()
    }

    /// Complete the round and hand over its segment list.
    pub fn finish(mut self) -> AssembledRound {
        let units = self.extractor.finish();
        self.absorb(units);
        tracing::debug!(
            segments = self.segments.len(),
            diagnostics = self.extractor.diagnostics().len(),
            "round assembled"
        );
        AssembledRound {
            diagnostics: self.extractor.diagnostics().to_vec(),
            markup: self.extractor.markup().to_string(),
            segments: self.segments,
        }
    }

    fn absorb(&mut self, units: Vec<ExtractedUnit>) {
        for unit in units {
            self.segments.extend(assemble_unit(unit));
        }
    }
}
