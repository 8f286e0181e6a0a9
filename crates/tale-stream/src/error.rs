//! Error types for the transport layer.

use tale_core::CoreError;
use thiserror::Error;

/// Result type for transport operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that end a round's delivery.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The generator could not produce the round.
    #[error("generation failed: {0}")]
    Generator(String),

    /// The chunking policy is unusable.
    #[error("invalid chunking: min {min}, max {max}")]
    InvalidChunking {
        /// Smallest chunk length.
        min: usize,
        /// Largest chunk length.
        max: usize,
    },

    /// Delivery stopped before the terminal frame.
    #[error("transport aborted before the round completed")]
    Aborted,

    /// A wire line could not be decoded, or frames arrived out of order.
    #[error("framing error: {0}")]
    Framing(#[from] CoreError),

    /// Frames arrived after the terminal frame, or the terminal frame is missing.
    #[error("bad frame sequence: {0}")]
    Sequence(String),

    /// A story script could not be read.
    #[error("invalid story script: {0}")]
    Script(#[from] toml::de::Error),
}
