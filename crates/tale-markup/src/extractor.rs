//! Incremental extraction of narrative units from streamed markup.
//!
//! The extractor owns the round's markup buffer. Fragments are appended as
//! they arrive and scanning resumes at the first unconsumed byte, so each
//! pass only looks at new input plus at most one incomplete tag.
//!
//! Vocabulary:
//!
//! ```text
//! <Narrator>text</Narrator>
//! <character name="X">
//!     <action expression="E">text</action>
//!     <say>text</say>
//! </character>
//! ```
//!
//! Tag names match ASCII case-insensitively. Unknown tags inside a text
//! accumulator (narration, action, say) are inline formatting: they wait for
//! their closing tag and then contribute their inner text. Unknown tags at
//! structural positions are transparent wrappers and are skipped.

use std::ops::Range;

use crate::diagnostics::Diagnostic;
use crate::lexer::find_tag_end;
use crate::parser::{Tag, TagKind, parse_tag};

/// Where the extractor currently is in the markup structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorState {
    /// Between units. Text here is discarded.
    #[default]
    Outside,
    /// Inside `<Narrator>`.
    InNarrator,
    /// Inside `<character>` but not in an action or say.
    InCharacterBlock,
    /// Inside `<action>` within a character block.
    InAction,
    /// Inside `<say>` within a character block.
    InSay,
}

/// A stage direction recorded inside a character block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    /// Value of the `expression` attribute, as written.
    pub expression: Option<String>,
    /// The action text, untrimmed.
    pub text: String,
}

/// A finished `<character>` block, before alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterBlock {
    /// Value of the `name` attribute.
    pub name: Option<String>,
    /// Actions in source order.
    pub actions: Vec<ActionEntry>,
    /// Dialogue lines in source order, untrimmed.
    pub lines: Vec<String>,
    /// Byte range of the block in the round buffer.
    pub span: Range<usize>,
}

/// A completed top-level unit, emitted in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedUnit {
    /// A `<Narrator>` block.
    Narration {
        /// The narration text, untrimmed.
        text: String,
        /// Byte range in the round buffer.
        span: Range<usize>,
    },
    /// A `<character>` block.
    Character(CharacterBlock),
}

impl ExtractedUnit {
    /// Byte range of the unit in the round buffer.
    pub fn span(&self) -> &Range<usize> {
        match self {
            Self::Narration { span, .. } => span,
            Self::Character(block) => &block.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocab {
    Narrator,
    Character,
    Action,
    Say,
}

impl Vocab {
    fn of(tag: &Tag) -> Option<Self> {
        [
            ("narrator", Self::Narrator),
            ("character", Self::Character),
            ("action", Self::Action),
            ("say", Self::Say),
        ]
        .into_iter()
        .find(|(name, _)| tag.is(name))
        .map(|(_, v)| v)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Narrator => "Narrator",
            Self::Character => "character",
            Self::Action => "action",
            Self::Say => "say",
        }
    }
}

enum Step {
    Advance(usize),
    Pending,
}

/// Open-unit bookkeeping, separate from the buffer so scanning can borrow
/// the buffer while mutating it.
#[derive(Debug, Default)]
struct Machine {
    state: ExtractorState,
    unit_start: usize,
    narration: String,
    block: Option<CharacterBlock>,
    inner: String,
    expression: Option<String>,
    ready: Vec<ExtractedUnit>,
    diagnostics: Vec<Diagnostic>,
}

impl Machine {
    fn append_text(&mut self, text: &str) {
        match self.state {
            ExtractorState::InNarrator => self.narration.push_str(text),
            ExtractorState::InAction | ExtractorState::InSay => self.inner.push_str(text),
            ExtractorState::Outside | ExtractorState::InCharacterBlock => {}
        }
    }

    fn in_text(&self) -> bool {
        matches!(
            self.state,
            ExtractorState::InNarrator | ExtractorState::InAction | ExtractorState::InSay
        )
    }

    fn warn(&mut self, span: Range<usize>, message: impl Into<String>) {
        let diag = Diagnostic::warning(span, message);
        tracing::warn!(span = ?diag.span, "{}", diag.message);
        self.diagnostics.push(diag);
    }

    fn error(&mut self, span: Range<usize>, message: impl Into<String>) {
        let diag = Diagnostic::error(span, message);
        tracing::warn!(span = ?diag.span, "{}", diag.message);
        self.diagnostics.push(diag);
    }

    fn open(&mut self, vocab: Vocab, tag: &Tag, span: Range<usize>) {
        match vocab {
            Vocab::Narrator | Vocab::Character => {
                if self.state != ExtractorState::Outside {
                    self.warn(
                        span.clone(),
                        format!("<{}> opened before the previous unit closed", vocab.name()),
                    );
                    self.close_all(span.start);
                }
                self.unit_start = span.start;
                if vocab == Vocab::Narrator {
                    self.narration.clear();
                    self.state = ExtractorState::InNarrator;
                } else {
                    if tag.attribute("name").is_none_or(|n| n.trim().is_empty()) {
                        self.warn(
                            span.clone(),
                            "<character> without a name; its lines become narration",
                        );
                    }
                    self.block = Some(CharacterBlock {
                        name: tag.attribute("name").map(str::to_string),
                        actions: Vec::new(),
                        lines: Vec::new(),
                        span: span.start..span.end,
                    });
                    self.state = ExtractorState::InCharacterBlock;
                }
            }
            Vocab::Action | Vocab::Say => {
                match self.state {
                    ExtractorState::InCharacterBlock => {}
                    ExtractorState::InAction | ExtractorState::InSay => {
                        self.warn(
                            span.clone(),
                            format!("<{}> opened before the previous one closed", vocab.name()),
                        );
                        self.close_inner();
                    }
                    ExtractorState::Outside | ExtractorState::InNarrator => {
                        self.warn(
                            span,
                            format!("<{}> outside a character block skipped", vocab.name()),
                        );
                        return;
                    }
                }
                self.inner.clear();
                if vocab == Vocab::Action {
                    self.expression = tag.attribute("expression").map(str::to_string);
                    self.state = ExtractorState::InAction;
                } else {
                    self.expression = None;
                    self.state = ExtractorState::InSay;
                }
            }
        }
    }

    fn close(&mut self, vocab: Vocab, span: Range<usize>) {
        use ExtractorState::*;
        match (vocab, self.state) {
            (Vocab::Narrator, InNarrator) => self.close_all(span.end),
            (Vocab::Character, InCharacterBlock) => self.close_all(span.end),
            (Vocab::Character, InAction | InSay) => {
                self.warn(span.clone(), "</character> closed an open action or say");
                self.close_all(span.end);
            }
            (Vocab::Action, InAction) | (Vocab::Say, InSay) => self.close_inner(),
            _ => self.warn(span, format!("stray </{}> skipped", vocab.name())),
        }
    }

    /// Record the open action or say into its block.
    fn close_inner(&mut self) {
        let text = std::mem::take(&mut self.inner);
        let Some(block) = self.block.as_mut() else {
            self.state = ExtractorState::Outside;
            return;
        };
        match self.state {
            ExtractorState::InAction => block.actions.push(ActionEntry {
                expression: self.expression.take(),
                text,
            }),
            ExtractorState::InSay => block.lines.push(text),
            _ => {}
        }
        self.state = ExtractorState::InCharacterBlock;
    }

    /// Close every open level, emitting the top-level unit ending at `end`.
    fn close_all(&mut self, end: usize) {
        match self.state {
            ExtractorState::Outside => return,
            ExtractorState::InNarrator => {
                let text = std::mem::take(&mut self.narration);
                tracing::debug!(start = self.unit_start, end, "narration extracted");
                self.ready.push(ExtractedUnit::Narration {
                    text,
                    span: self.unit_start..end,
                });
            }
            ExtractorState::InAction | ExtractorState::InSay | ExtractorState::InCharacterBlock => {
                self.close_inner();
                if let Some(mut block) = self.block.take() {
                    block.span = self.unit_start..end;
                    tracing::debug!(
                        name = block.name.as_deref().unwrap_or(""),
                        lines = block.lines.len(),
                        actions = block.actions.len(),
                        "character block extracted"
                    );
                    self.ready.push(ExtractedUnit::Character(block));
                }
            }
        }
        self.state = ExtractorState::Outside;
    }
}

/// Streaming state machine turning markup fragments into [`ExtractedUnit`]s.
///
/// Extraction is best effort: a `<` followed by a letter always starts a
/// tag, so prose like `a<b then c` loses everything up to the next `>` as a
/// malformed tag. A `<` followed by anything else (`3 < 5`) stays literal.
#[derive(Debug, Default)]
pub struct MarkupExtractor {
    buffer: String,
    scanned: usize,
    complete: bool,
    machine: Machine,
}

impl MarkupExtractor {
    /// Create an extractor for a new round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every unit it completed, in source order.
    ///
    /// Fragments pushed after [`finish`](Self::finish) are ignored.
    pub fn push(&mut self, fragment: &str) -> Vec<ExtractedUnit> {
        if self.complete {
            tracing::warn!(len = fragment.len(), "fragment after round completion ignored");
            return Vec::new();
        }
        self.buffer.push_str(fragment);
        self.scan();
        std::mem::take(&mut self.machine.ready)
    }

    /// Mark the round complete and flush what remains.
    ///
    /// Pending unknown tags are skipped, a dangling `<...` is dropped, and
    /// unclosed units are salvaged. Calling this twice returns nothing new.
    pub fn finish(&mut self) -> Vec<ExtractedUnit> {
        if self.complete {
            return Vec::new();
        }
        self.complete = true;
        self.scan();
        if self.machine.state != ExtractorState::Outside {
            let end = self.buffer.len();
            self.machine.warn(
                self.machine.unit_start..end,
                "unit left open at end of round was salvaged",
            );
            self.machine.close_all(end);
        }
        std::mem::take(&mut self.machine.ready)
    }

    /// Whether the round's terminal marker has been seen.
    pub fn is_round_complete(&self) -> bool {
        self.complete
    }

    /// Current structural state.
    pub fn state(&self) -> ExtractorState {
        self.machine.state
    }

    /// The round's markup received so far.
    pub fn markup(&self) -> &str {
        &self.buffer
    }

    /// Byte offset up to which the buffer has been consumed.
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Unconsumed suffix waiting for more input.
    pub fn pending(&self) -> &str {
        &self.buffer[self.scanned..]
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.machine.diagnostics
    }

    fn scan(&mut self) {
        loop {
            let rest = &self.buffer[self.scanned..];
            if rest.is_empty() {
                break;
            }
            let Some(lt) = rest.find('<') else {
                self.machine.append_text(rest);
                self.scanned = self.buffer.len();
                break;
            };
            if lt > 0 {
                let end = self.scanned + lt;
                self.machine.append_text(&self.buffer[self.scanned..end]);
                self.scanned = end;
            }
            match self.step_tag(self.scanned) {
                Step::Advance(next) => self.scanned = next,
                Step::Pending => break,
            }
        }
    }

    /// Handle the `<` at `start`.
    fn step_tag(&mut self, start: usize) -> Step {
        let after = start + 1;
        let Some(next_char) = self.buffer[after..].chars().next() else {
            if self.complete {
                self.machine.append_text("<");
                return Step::Advance(after);
            }
            return Step::Pending;
        };
        if !(next_char.is_ascii_alphabetic() || matches!(next_char, '/' | '!' | '?')) {
            // "3 < 5": not a tag.
            self.machine.append_text("<");
            return Step::Advance(after);
        }

        let Some(rel) = find_tag_end(&self.buffer[after..]) else {
            if self.complete {
                let end = self.buffer.len();
                self.machine
                    .error(start..end, "unterminated tag dropped at end of round");
                return Step::Advance(end);
            }
            return Step::Pending;
        };
        let gt = after + rel;
        let next = gt + 1;

        let tag = match parse_tag(&self.buffer[after..gt]) {
            Ok(tag) => tag,
            Err(errors) => {
                let reason = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                self.machine
                    .error(start..next, format!("malformed tag skipped: {reason}"));
                return Step::Advance(next);
            }
        };

        match (Vocab::of(&tag), tag.kind) {
            (Some(vocab), TagKind::Open) => {
                self.machine.open(vocab, &tag, start..next);
                Step::Advance(next)
            }
            (Some(vocab), TagKind::Close) => {
                self.machine.close(vocab, start..next);
                Step::Advance(next)
            }
            (Some(vocab), TagKind::SelfClosing) => {
                tracing::debug!(tag = vocab.name(), "empty self-closing tag ignored");
                Step::Advance(next)
            }
            (None, TagKind::SelfClosing) => Step::Advance(next),
            (None, TagKind::Close) => {
                if self.machine.in_text() {
                    self.machine
                        .warn(start..next, format!("stray </{}> skipped", tag.name));
                }
                Step::Advance(next)
            }
            (None, TagKind::Open) if !self.machine.in_text() => {
                tracing::debug!(tag = %tag.name, "unknown wrapper tag skipped");
                Step::Advance(next)
            }
            (None, TagKind::Open) => match find_closing(&self.buffer[next..], &tag.name) {
                Some((inner_end, close_end)) => {
                    let inner = strip_tags(&self.buffer[next..next + inner_end]);
                    self.machine.append_text(&inner);
                    Step::Advance(next + close_end)
                }
                None if self.complete => {
                    self.machine
                        .warn(start..next, format!("unclosed <{}> skipped", tag.name));
                    Step::Advance(next)
                }
                None => Step::Pending,
            },
        }
    }
}

/// Find `</name>` in `source`. Returns the offsets of its `<` and one past
/// its `>`.
fn find_closing(source: &str, name: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(rel) = source[from..].find("</") {
        let start = from + rel;
        let gt = start + 1 + find_tag_end(&source[start + 1..])?;
        if let Ok(tag) = parse_tag(&source[start + 1..gt])
            && tag.kind == TagKind::Close
            && tag.is(name)
        {
            return Some((start, gt + 1));
        }
        from = gt + 1;
    }
    None
}

/// Remove every complete `<...>` from inline text.
fn strip_tags(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        match find_tag_end(&rest[lt + 1..]) {
            Some(rel) => rest = &rest[lt + 1 + rel + 1..],
            None => {
                rest = &rest[lt..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Run a fresh extractor over a complete buffer.
pub fn extract_units(markup: &str) -> (Vec<ExtractedUnit>, Vec<Diagnostic>) {
    let mut extractor = MarkupExtractor::new();
    let mut units = extractor.push(markup);
    units.extend(extractor.finish());
    let diagnostics = extractor.diagnostics().to_vec();
    (units, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narration(unit: &ExtractedUnit) -> &str {
        match unit {
            ExtractedUnit::Narration { text, .. } => text,
            other => panic!("expected narration, got {other:?}"),
        }
    }

    fn block(unit: &ExtractedUnit) -> &CharacterBlock {
        match unit {
            ExtractedUnit::Character(b) => b,
            other => panic!("expected character block, got {other:?}"),
        }
    }

    #[test]
    fn extracts_narration_when_closed() {
        let mut ex = MarkupExtractor::new();
        assert!(ex.push("<Narrator>A door").is_empty());
        assert_eq!(ex.state(), ExtractorState::InNarrator);
        let units = ex.push(" creaks.</Narrator>");
        assert_eq!(units.len(), 1);
        assert_eq!(narration(&units[0]), "A door creaks.");
        assert_eq!(ex.state(), ExtractorState::Outside);
    }

    #[test]
    fn incomplete_tag_is_retained() {
        let mut ex = MarkupExtractor::new();
        assert!(ex.push("<Narrator>Hi</Narr").is_empty());
        assert_eq!(ex.pending(), "</Narr");
        let units = ex.push("ator>");
        assert_eq!(narration(&units[0]), "Hi");
        assert_eq!(ex.pending(), "");
        assert_eq!(ex.scanned(), ex.markup().len());
    }

    #[test]
    fn lone_angle_bracket_waits() {
        let mut ex = MarkupExtractor::new();
        ex.push("<Narrator>x");
        ex.push("<");
        assert_eq!(ex.pending(), "<");
        let units = ex.push("/Narrator>");
        assert_eq!(narration(&units[0]), "x");
    }

    #[test]
    fn character_block_collects_actions_and_lines() {
        let (units, diags) = extract_units(
            r#"<character name="Ari"><action expression="Happy">smiles</action><say>Hello!</say><say>Again.</say></character>"#,
        );
        assert!(diags.is_empty(), "{diags:?}");
        let b = block(&units[0]);
        assert_eq!(b.name.as_deref(), Some("Ari"));
        assert_eq!(b.actions.len(), 1);
        assert_eq!(b.actions[0].expression.as_deref(), Some("Happy"));
        assert_eq!(b.actions[0].text, "smiles");
        assert_eq!(b.lines, vec!["Hello!", "Again."]);
    }

    #[test]
    fn units_come_out_in_source_order() {
        let (units, _) = extract_units(
            r#"<Narrator>one</Narrator><character name="B"><say>two</say></character><Narrator>three</Narrator>"#,
        );
        assert_eq!(units.len(), 3);
        assert_eq!(narration(&units[0]), "one");
        assert_eq!(block(&units[1]).lines, vec!["two"]);
        assert_eq!(narration(&units[2]), "three");
        assert!(units[0].span().end <= units[1].span().start);
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        let (units, _) = extract_units("<NARRATOR>loud</narrator>");
        assert_eq!(narration(&units[0]), "loud");
    }

    #[test]
    fn literal_less_than_is_text() {
        let (units, _) = extract_units("<Narrator>3 < 5</Narrator>");
        assert_eq!(narration(&units[0]), "3 < 5");
    }

    #[test]
    fn less_than_before_letter_starts_a_tag() {
        let (units, diags) = extract_units("<Narrator>if a<b then c</Narrator>");
        assert_eq!(units.len(), 1);
        let text = narration(&units[0]);
        assert!(text.starts_with("if a"));
        assert!(!text.contains("then c"));
        assert!(!diags.is_empty());
    }

    #[test]
    fn inline_unknown_tag_contributes_text() {
        let mut ex = MarkupExtractor::new();
        assert!(ex.push("<Narrator>It was <em>very").is_empty());
        assert_eq!(ex.pending(), "<em>very");
        let units = ex.push(" dark</em>.</Narrator>");
        assert_eq!(narration(&units[0]), "It was very dark.");
    }

    #[test]
    fn unknown_wrapper_tag_is_transparent() {
        let (units, diags) = extract_units("<story><Narrator>inside</Narrator></story>");
        assert_eq!(units.len(), 1);
        assert_eq!(narration(&units[0]), "inside");
        assert!(diags.is_empty());
    }

    #[test]
    fn unclosed_inline_tag_skipped_on_finish() {
        let mut ex = MarkupExtractor::new();
        assert!(ex.push("<Narrator>a <b>bold</Narrator>").is_empty());
        let units = ex.finish();
        assert_eq!(narration(&units[0]), "a bold");
        assert!(ex.is_round_complete());
        assert!(ex.diagnostics().iter().any(|d| d.message.contains("<b>")));
    }

    #[test]
    fn stray_close_is_skipped() {
        let (units, diags) = extract_units("</say><Narrator>ok</Narrator>");
        assert_eq!(narration(&units[0]), "ok");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("stray </say>"));
    }

    #[test]
    fn say_outside_block_is_skipped() {
        let (units, diags) = extract_units("<say>lost</say><Narrator>kept</Narrator>");
        assert_eq!(units.len(), 1);
        assert_eq!(narration(&units[0]), "kept");
        assert!(!diags.is_empty());
    }

    #[test]
    fn opening_unit_closes_previous() {
        let (units, diags) =
            extract_units(r#"<Narrator>first<character name="A"><say>hi</say></character>"#);
        assert_eq!(units.len(), 2);
        assert_eq!(narration(&units[0]), "first");
        assert_eq!(block(&units[1]).lines, vec!["hi"]);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn character_close_closes_open_say() {
        let (units, _) = extract_units(r#"<character name="A"><say>hi</character>"#);
        assert_eq!(block(&units[0]).lines, vec!["hi"]);
    }

    #[test]
    fn unclosed_unit_salvaged_on_finish() {
        let mut ex = MarkupExtractor::new();
        assert!(ex.push(r#"<character name="A"><say>cut of"#).is_empty());
        let units = ex.finish();
        assert_eq!(block(&units[0]).lines, vec!["cut of"]);
        assert_eq!(ex.state(), ExtractorState::Outside);
    }

    #[test]
    fn dangling_tag_dropped_on_finish() {
        let mut ex = MarkupExtractor::new();
        ex.push("<Narrator>done</Narrator><charac");
        let units = ex.finish();
        assert!(units.is_empty());
        assert!(
            ex.diagnostics()
                .iter()
                .any(|d| d.severity == crate::diagnostics::Severity::Error)
        );
    }

    #[test]
    fn malformed_tag_skipped() {
        let (units, diags) = extract_units("<Narrator>a<!-- note -->b</Narrator>");
        assert_eq!(narration(&units[0]), "ab");
        assert!(diags[0].message.starts_with("malformed tag"));
    }

    #[test]
    fn finish_is_idempotent_and_blocks_more_input() {
        let mut ex = MarkupExtractor::new();
        ex.push("<Narrator>x</Narrator>");
        assert!(ex.finish().is_empty());
        assert!(ex.finish().is_empty());
        assert!(ex.push("<Narrator>y</Narrator>").is_empty());
    }

    #[test]
    fn text_outside_units_is_discarded() {
        let (units, _) = extract_units("Sure! Here you go:\n<Narrator>x</Narrator>\nThanks");
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn strip_tags_removes_complete_tags() {
        assert_eq!(strip_tags("a<i>b</i>c"), "abc");
        assert_eq!(strip_tags("a<i"), "a<i");
    }
}
