use serde::{Deserialize, Serialize};

/// One option offered to the player at a choice point.
///
/// The `id` is opaque: the caller hands it back verbatim when requesting the
/// next round. One id value is reserved by the playback layer to mean "end the
/// session" (see `PlaybackConfig::end_choice_id` in `tale-playback`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    /// Opaque identifier, matched verbatim.
    pub id: String,
    /// Text shown to the player.
    pub text: String,
}

impl Choice {
    /// Create a choice.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_json_shape() {
        let c = Choice::new("open-door", "Open the door");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"id":"open-door","text":"Open the door"}"#);
    }

    #[test]
    fn display_uses_text() {
        assert_eq!(Choice::new("a", "Run").to_string(), "Run");
    }
}
