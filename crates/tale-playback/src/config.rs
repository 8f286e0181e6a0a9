//! Reveal timing and engine configuration.

use std::time::Duration;

use serde::Deserialize;
use tale_stream::TransportConfig;

use crate::error::{PlaybackError, PlaybackResult};

/// Configuration for the playback sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Characters revealed per tick.
    pub chars_per_tick: usize,
    /// Time between ticks, in milliseconds.
    pub reveal_interval_ms: u64,
    /// Choice id that ends the session instead of continuing it.
    pub end_choice_id: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chars_per_tick: 2,
            reveal_interval_ms: 30,
            end_choice_id: "end".to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Set characters revealed per tick (at least 1).
    pub fn with_chars_per_tick(mut self, chars: usize) -> Self {
        self.chars_per_tick = chars.max(1);
        self
    }

    /// Set the time between ticks.
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the reserved end-of-session choice id.
    pub fn with_end_choice_id(mut self, id: impl Into<String>) -> Self {
        self.end_choice_id = id.into();
        self
    }

    /// Time between ticks.
    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }

    /// Reject a policy under which ticks never reveal anything.
    pub fn validate(&self) -> PlaybackResult<()> {
        if self.chars_per_tick == 0 {
            return Err(PlaybackError::InvalidRevealRate);
        }
        Ok(())
    }
}

/// Everything a [`StoryEngine`](crate::StoryEngine) needs.
///
/// ```toml
/// [transport]
/// min_chunk = 4
/// delivery = "fast"
///
/// [playback]
/// chars_per_tick = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame delivery policy.
    pub transport: TransportConfig,
    /// Reveal policy.
    pub playback: PlaybackConfig,
}

impl EngineConfig {
    /// Parse a TOML configuration. Missing keys keep their defaults.
    pub fn from_toml(source: &str) -> PlaybackResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.playback.validate()?;
        Ok(config)
    }

    /// Replace the transport policy.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the reveal policy.
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }
}
