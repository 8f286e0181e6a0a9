//! Error types for playback.

use tale_stream::StreamError;
use thiserror::Error;

/// Result type for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Errors that can occur while driving a story.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The requested action is not valid in the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// The attempted action.
        action: &'static str,
        /// The state the sequencer was in.
        state: String,
    },

    /// The reveal policy would never finish a segment.
    #[error("chars_per_tick must be at least 1")]
    InvalidRevealRate,

    /// The selected choice was not offered.
    #[error("no choice with id \"{0}\"")]
    UnknownChoice(String),

    /// The round could not be delivered.
    #[error(transparent)]
    Transport(#[from] StreamError),

    /// The story has ended; only a reset or new input can continue.
    #[error("the story has ended")]
    SessionEnded,

    /// Engine configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
