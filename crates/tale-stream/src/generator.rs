//! The generator collaborator and two fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tale_core::{Choice, ConversationEntry};

use crate::error::{StreamError, StreamResult};

/// What prompted a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundInput {
    /// Free text typed by the player.
    Utterance(String),
    /// The id of a choice the player selected.
    Choice(String),
}

/// Everything a generator gets to produce one round.
#[derive(Debug, Clone)]
pub struct RoundRequest {
    /// What prompted the round.
    pub input: RoundInput,
    /// History of earlier rounds, oldest first.
    pub history: Vec<ConversationEntry>,
}

impl RoundRequest {
    /// Create a request with no prior history.
    pub fn new(input: RoundInput) -> Self {
        Self {
            input,
            history: Vec::new(),
        }
    }

    /// Attach prior history.
    pub fn with_history(mut self, history: Vec<ConversationEntry>) -> Self {
        self.history = history;
        self
    }
}

/// One round's output: the markup plus the choices that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedRound {
    /// Complete markup for the round.
    pub markup: String,
    /// Choices offered after the round. Empty ends the story.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Produces the markup for a round. May be a model call or a fixture.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate the round for `request`.
    async fn generate(&self, request: &RoundRequest) -> StreamResult<GeneratedRound>;
}

/// Always returns the same round.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    round: GeneratedRound,
}

impl StaticGenerator {
    /// Serve `markup` followed by `choices`.
    pub fn new(markup: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            round: GeneratedRound {
                markup: markup.into(),
                choices,
            },
        }
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    async fn generate(&self, _request: &RoundRequest) -> StreamResult<GeneratedRound> {
        Ok(self.round.clone())
    }
}

/// One scene of a story script.
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    /// Scene id; a choice with the same id leads here.
    pub id: String,
    /// The scene's markup.
    pub markup: String,
    /// Choices offered after the scene.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A branching story loaded from TOML.
///
/// ```toml
/// start = "gate"
///
/// [[scene]]
/// id = "gate"
/// markup = "<Narrator>The gate is shut.</Narrator>"
/// choices = [{ id = "knock", text = "Knock" }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StoryScript {
    /// Scene served for free-text input.
    #[serde(default = "default_start")]
    pub start: String,
    /// All scenes.
    #[serde(rename = "scene", default)]
    pub scenes: Vec<Scene>,
}

fn default_start() -> String {
    "start".to_string()
}

/// Serves scenes from a [`StoryScript`]: choice ids select scenes by id,
/// free text always gets the start scene.
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: StoryScript,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    /// Wrap a parsed script.
    pub fn new(script: StoryScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// Parse a TOML story script.
    pub fn from_toml(source: &str) -> StreamResult<Self> {
        Ok(Self::new(toml::from_str(source)?))
    }

    /// Look up a scene by id.
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.script.scenes.iter().find(|s| s.id == id)
    }

    /// Number of rounds requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &RoundRequest) -> StreamResult<GeneratedRound> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let id = match &request.input {
            RoundInput::Choice(id) => id.as_str(),
            RoundInput::Utterance(_) => self.script.start.as_str(),
        };
        let scene = self
            .scene(id)
            .ok_or_else(|| StreamError::Generator(format!("no scene \"{id}\" in script")))?;
        Ok(GeneratedRound {
            markup: scene.markup.clone(),
            choices: scene.choices.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
start = "gate"

[[scene]]
id = "gate"
markup = "<Narrator>The gate is shut.</Narrator>"
choices = [{ id = "knock", text = "Knock" }]

[[scene]]
id = "knock"
markup = "<Narrator>Nobody answers.</Narrator>"
"#;

    #[tokio::test]
    async fn utterance_gets_start_scene() {
        let generator = ScriptedGenerator::from_toml(SCRIPT).unwrap();
        let round = generator
            .generate(&RoundRequest::new(RoundInput::Utterance("hi".into())))
            .await
            .unwrap();
        assert!(round.markup.contains("gate is shut"));
        assert_eq!(round.choices, vec![Choice::new("knock", "Knock")]);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn choice_selects_scene() {
        let generator = ScriptedGenerator::from_toml(SCRIPT).unwrap();
        let round = generator
            .generate(&RoundRequest::new(RoundInput::Choice("knock".into())))
            .await
            .unwrap();
        assert!(round.choices.is_empty());
    }

    #[tokio::test]
    async fn unknown_choice_fails() {
        let generator = ScriptedGenerator::from_toml(SCRIPT).unwrap();
        let err = generator
            .generate(&RoundRequest::new(RoundInput::Choice("fly".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Generator(m) if m.contains("fly")));
    }

    #[test]
    fn bad_script_is_an_error() {
        assert!(matches!(
            ScriptedGenerator::from_toml("[[scene]]\nid = 3"),
            Err(StreamError::Script(_))
        ));
    }
}
