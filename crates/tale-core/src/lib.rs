//! Core types for tale: narrative segments, choices, wire frames, and history.
//!
//! This crate defines the data that flows through the story engine. It knows
//! nothing about markup parsing or playback timing. Segments are produced by
//! `tale-markup`, frames by `tale-stream`, and history entries by
//! `tale-playback`.

/// Player-facing decision options.
pub mod choice;
/// Error types used throughout the crate.
pub mod error;
/// Transport frames and their newline-delimited JSON encoding.
pub mod frame;
/// Append-only conversation history.
pub mod history;
/// Displayable narrative segments.
pub mod segment;

/// Re-export choice types.
pub use choice::Choice;
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export frame types.
pub use frame::{ContentFrame, LineDecoder, decode_frame, encode_frame};
/// Re-export history types.
pub use history::{ConversationEntry, HistorySink, MemoryHistory};
/// Re-export segment types.
pub use segment::{CharacterLine, NEUTRAL_EXPRESSION, Segment};
