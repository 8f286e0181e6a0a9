use serde::{Deserialize, Serialize};

/// Expression assigned to a character line that has no matching action.
pub const NEUTRAL_EXPRESSION: &str = "neutral";

/// One atomic unit of displayable narrative content.
///
/// Text is always trimmed and non-empty; the constructors return `None`
/// rather than build a segment that would display nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    /// Narration, spoken by nobody.
    #[serde(rename = "narrator")]
    Narration {
        /// The narration text.
        text: String,
    },
    /// A line of dialogue spoken by a named character.
    Character(CharacterLine),
}

/// A single line of character dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterLine {
    /// Speaking character.
    pub name: String,
    /// Lower-cased emotional tag, `neutral` when none was given.
    pub expression: String,
    /// The spoken text.
    pub text: String,
    /// Stage direction accompanying the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Segment {
    /// Build a narration segment, or `None` if the text is blank.
    pub fn narration(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self::Narration {
            text: text.to_string(),
        })
    }

    /// Build a character segment, or `None` if the text is blank.
    pub fn character(name: &str, expression: &str, text: &str) -> Option<Self> {
        CharacterLine::new(name, expression, text).map(Self::Character)
    }

    /// The displayable text.
    pub fn text(&self) -> &str {
        match self {
            Self::Narration { text } => text,
            Self::Character(line) => &line.text,
        }
    }

    /// Speaking character, if any.
    pub fn speaker(&self) -> Option<&str> {
        match self {
            Self::Narration { .. } => None,
            Self::Character(line) => Some(&line.name),
        }
    }

    /// Length of the text in characters, the unit the reveal works in.
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    /// The first `chars` characters of the text.
    pub fn visible_prefix(&self, chars: usize) -> &str {
        let text = self.text();
        match text.char_indices().nth(chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

impl CharacterLine {
    /// Build a character line, or `None` if the text is blank.
    ///
    /// The expression is trimmed and lower-cased; a blank expression becomes
    /// [`NEUTRAL_EXPRESSION`].
    pub fn new(name: &str, expression: &str, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let expression = expression.trim().to_lowercase();
        Some(Self {
            name: name.trim().to_string(),
            expression: if expression.is_empty() {
                NEUTRAL_EXPRESSION.to_string()
            } else {
                expression
            },
            text: text.to_string(),
            action: None,
        })
    }

    /// Attach a stage direction. Blank actions are ignored.
    pub fn with_action(mut self, action: &str) -> Self {
        let action = action.trim();
        self.action = (!action.is_empty()).then(|| action.to_string());
        self
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Narration { text } => write!(f, "{text}"),
            Self::Character(line) => match &line.action {
                Some(action) => write!(
                    f,
                    "{} ({}, {action}): {}",
                    line.name, line.expression, line.text
                ),
                None => write!(f, "{} ({}): {}", line.name, line.expression, line.text),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(Segment::narration("   \n").is_none());
        assert!(Segment::character("Ari", "happy", "").is_none());
    }

    #[test]
    fn text_is_trimmed() {
        let seg = Segment::narration("  A door creaks.\n").unwrap();
        assert_eq!(seg.text(), "A door creaks.");
    }

    #[test]
    fn expression_lowercased_and_defaulted() {
        let line = CharacterLine::new("Ari", " Happy ", "Hello!").unwrap();
        assert_eq!(line.expression, "happy");
        let line = CharacterLine::new("Ari", "", "Hello!").unwrap();
        assert_eq!(line.expression, NEUTRAL_EXPRESSION);
    }

    #[test]
    fn blank_action_is_dropped() {
        let line = CharacterLine::new("Ari", "happy", "Hi").unwrap().with_action("  ");
        assert_eq!(line.action, None);
        let line = line.with_action(" smiles ");
        assert_eq!(line.action.as_deref(), Some("smiles"));
    }

    #[test]
    fn json_shape_matches_wire_contract() {
        let seg = Segment::Character(
            CharacterLine::new("Ari", "Happy", "Hello!")
                .unwrap()
                .with_action("smiles"),
        );
        let value = serde_json::to_value(&seg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "character",
                "name": "Ari",
                "expression": "happy",
                "text": "Hello!",
                "action": "smiles"
            })
        );

        let narr = serde_json::to_value(Segment::narration("Dusk.").unwrap()).unwrap();
        assert_eq!(narr, serde_json::json!({"type": "narrator", "text": "Dusk."}));
    }

    #[test]
    fn visible_prefix_respects_char_boundaries() {
        let seg = Segment::narration("Grüße!").unwrap();
        assert_eq!(seg.char_len(), 6);
        assert_eq!(seg.visible_prefix(3), "Grü");
        assert_eq!(seg.visible_prefix(0), "");
        assert_eq!(seg.visible_prefix(99), "Grüße!");
    }

    #[test]
    fn display_formats() {
        let seg = Segment::character("Ari", "happy", "Hello!").unwrap();
        assert_eq!(seg.to_string(), "Ari (happy): Hello!");
        assert_eq!(seg.speaker(), Some("Ari"));
    }
}
