//! The per-round playback state machine.
//!
//! One cursor walks the round's segments in order. Each segment is revealed
//! (by ticks or a skip) and then advanced past; advancing is the only point at
//! which a segment is committed to history. After the last segment the
//! decision set is offered, or the story ends if there is none.

use std::fmt;

use tale_core::{Choice, Segment};
use tale_stream::RoundInput;

use crate::config::PlaybackConfig;
use crate::effect::Effect;
use crate::error::{PlaybackError, PlaybackResult};

/// Where the sequencer is within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No round loaded.
    Idle,
    /// Segment `index` is partially revealed.
    Revealing {
        /// Active segment.
        index: usize,
    },
    /// Segment `index` is fully revealed and waiting for "continue".
    Revealed {
        /// Active segment.
        index: usize,
    },
    /// Every segment has been played; waiting for a choice.
    AwaitingChoice,
    /// Every segment has been played and there is nothing to choose.
    Complete,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Revealing { index } => write!(f, "revealing segment {index}"),
            Self::Revealed { index } => write!(f, "showing segment {index}"),
            Self::AwaitingChoice => write!(f, "awaiting a choice"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// How much of the active segment is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Part of the text.
    Partial,
    /// All of it.
    Full,
}

/// Read-only view of the active position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor<'a> {
    /// The round's segments.
    pub segments: &'a [Segment],
    /// Active segment.
    pub index: usize,
    /// Reveal progress of the active segment.
    pub revealed: Reveal,
}

/// Drives one round at a time. Pure: every operation returns the [`Effect`]s
/// its owner must apply.
#[derive(Debug, Clone)]
pub struct Sequencer {
    config: PlaybackConfig,
    state: PlaybackState,
    segments: Vec<Segment>,
    choices: Vec<Choice>,
    visible: usize,
}

impl Sequencer {
    /// Create an idle sequencer. A zero reveal rate is raised to 1.
    pub fn new(config: PlaybackConfig) -> Self {
        let chars_per_tick = config.chars_per_tick.max(1);
        Self {
            config: PlaybackConfig {
                chars_per_tick,
                ..config
            },
            state: PlaybackState::Idle,
            segments: Vec::new(),
            choices: Vec::new(),
            visible: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The loaded round's segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The loaded round's decision set.
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// The configuration.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// The active position, if a segment is active.
    pub fn cursor(&self) -> Option<PlaybackCursor<'_>> {
        let (index, revealed) = match self.state {
            PlaybackState::Revealing { index } => (index, Reveal::Partial),
            PlaybackState::Revealed { index } => (index, Reveal::Full),
            _ => return None,
        };
        Some(PlaybackCursor {
            segments: &self.segments,
            index,
            revealed,
        })
    }

    /// The active segment.
    pub fn active(&self) -> Option<&Segment> {
        self.cursor().map(|c| &c.segments[c.index])
    }

    /// The visible part of the active segment's text.
    pub fn visible_text(&self) -> &str {
        self.active()
            .map(|s| s.visible_prefix(self.visible))
            .unwrap_or("")
    }

    /// Load a round. Replaces whatever was loaded before.
    ///
    /// A round with no segments completes immediately, even if it carries choices.
    pub fn load(
        &mut self,
        segments: Vec<Segment>,
        choices: Vec<Choice>,
    ) -> PlaybackResult<Vec<Effect>> {
        if self.state != PlaybackState::Idle {
            return Err(self.invalid("load a round"));
        }
        tracing::info!(segments = segments.len(), choices = choices.len(), "round loaded");
        self.segments = segments;
        self.choices = choices;
        self.visible = 0;

        match self.segments.first() {
            Some(first) => {
                self.state = PlaybackState::Revealing { index: 0 };
                Ok(vec![Effect::SegmentActive {
                    index: 0,
                    segment: first.clone(),
                }])
            }
            None => {
                tracing::info!("empty round");
                self.state = PlaybackState::Complete;
                Ok(vec![Effect::RoundComplete])
            }
        }
    }

    /// Reveal more of the active segment. Does nothing unless revealing.
    pub fn tick(&mut self) -> Vec<Effect> {
        let PlaybackState::Revealing { index } = self.state else {
            return Vec::new();
        };
        let len = self.segments[index].char_len();
        self.visible = (self.visible + self.config.chars_per_tick).min(len);
        if self.visible == len {
            self.state = PlaybackState::Revealed { index };
        }
        vec![Effect::RevealProgress {
            index,
            visible: self.visible,
        }]
    }

    /// Reveal the rest of the active segment at once.
    pub fn skip(&mut self) -> PlaybackResult<Vec<Effect>> {
        let PlaybackState::Revealing { index } = self.state else {
            return Err(self.invalid("skip"));
        };
        self.visible = self.segments[index].char_len();
        self.state = PlaybackState::Revealed { index };
        Ok(vec![Effect::RevealProgress {
            index,
            visible: self.visible,
        }])
    }

    /// Commit the fully revealed segment and move past it.
    pub fn advance(&mut self) -> PlaybackResult<Vec<Effect>> {
        let PlaybackState::Revealed { index } = self.state else {
            return Err(self.invalid("advance"));
        };
        let mut effects = vec![Effect::CommitSegment(self.segments[index].clone())];
        let next = index + 1;
        self.visible = 0;

        if let Some(segment) = self.segments.get(next) {
            self.state = PlaybackState::Revealing { index: next };
            effects.push(Effect::SegmentActive {
                index: next,
                segment: segment.clone(),
            });
        } else if self.choices.is_empty() {
            self.state = PlaybackState::Complete;
            effects.push(Effect::RoundComplete);
        } else {
            self.state = PlaybackState::AwaitingChoice;
            effects.push(Effect::Choices(self.choices.clone()));
            effects.push(Effect::RoundComplete);
        }
        Ok(effects)
    }

    /// Skip if revealing, otherwise advance. The "continue" key.
    pub fn proceed(&mut self) -> PlaybackResult<Vec<Effect>> {
        match self.state {
            PlaybackState::Revealing { .. } => self.skip(),
            PlaybackState::Complete => Err(PlaybackError::SessionEnded),
            _ => self.advance(),
        }
    }

    /// Select a choice by id.
    ///
    /// The reserved end id commits the choice and resets the session; any
    /// other offered id commits it and requests the next round.
    pub fn choose(&mut self, id: &str) -> PlaybackResult<Vec<Effect>> {
        match self.state {
            PlaybackState::AwaitingChoice => {}
            PlaybackState::Complete => return Err(PlaybackError::SessionEnded),
            _ => return Err(self.invalid("choose")),
        }
        let is_end = id == self.config.end_choice_id;
        let choice = match self.choices.iter().find(|c| c.id == id) {
            Some(choice) => choice.clone(),
            None if is_end => Choice::new(id, id),
            None => return Err(PlaybackError::UnknownChoice(id.to_string())),
        };
        tracing::info!(choice = %choice.id, "choice selected");

        let mut effects = vec![Effect::CommitChoice(choice)];
        if is_end {
            effects.extend(self.reset());
        } else {
            self.clear();
            effects.push(Effect::RequestRound(RoundInput::Choice(id.to_string())));
        }
        Ok(effects)
    }

    /// Free-text input: commit it and request a round answering it.
    ///
    /// Allowed before the first round, at a choice point, and after the story ended.
    pub fn submit_text(&mut self, text: &str) -> PlaybackResult<Vec<Effect>> {
        match self.state {
            PlaybackState::Idle | PlaybackState::AwaitingChoice | PlaybackState::Complete => {}
            _ => return Err(self.invalid("take input")),
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.clear();
        Ok(vec![
            Effect::CommitInput(text.to_string()),
            Effect::RequestRound(RoundInput::Utterance(text.to_string())),
        ])
    }

    /// Discard the round and return to the pre-session state.
    pub fn reset(&mut self) -> Vec<Effect> {
        tracing::info!("session reset");
        self.clear();
        vec![Effect::SessionReset]
    }

    fn clear(&mut self) {
        self.state = PlaybackState::Idle;
        self.segments.clear();
        self.choices.clear();
        self.visible = 0;
    }

    fn invalid(&self, action: &'static str) -> PlaybackError {
        PlaybackError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}
