//! Playback for tale: the per-round sequencer and the story engine.
//!
//! [`Sequencer`] is a pure state machine over one round's segments. It
//! returns [`Effect`]s instead of touching anything itself. [`StoryEngine`]
//! owns a sequencer, a transport, and the two collaborators (history and
//! rendering), fetches rounds when the sequencer asks for them, and applies
//! the effects.

/// Reveal timing and engine configuration.
pub mod config;
/// The story engine.
pub mod engine;
/// Sequencer effects.
pub mod effect;
/// Error types used throughout the crate.
pub mod error;
/// The per-round state machine.
pub mod sequencer;
/// The rendering collaborator.
pub mod sink;

/// Re-export config types.
pub use config::{EngineConfig, PlaybackConfig};
/// Re-export effect types.
pub use effect::Effect;
/// Re-export engine types.
pub use engine::{SessionState, StoryEngine};
/// Re-export error types.
pub use error::{PlaybackError, PlaybackResult};
/// Re-export sequencer types.
pub use sequencer::{PlaybackCursor, PlaybackState, Reveal, Sequencer};
/// Re-export sink types.
pub use sink::{NullRender, RenderSink};
