//! Round generation and frame delivery for tale.
//!
//! A [`Generator`] produces one round of markup plus its choices. A
//! [`Transport`] runs the generator on a background task and delivers the
//! markup as a [`FrameStream`] of content frames followed by one terminal
//! frame. The transport never looks inside the markup.

/// Delivery policy.
pub mod config;
/// Error types used throughout the crate.
pub mod error;
/// The generator collaborator and fixtures.
pub mod generator;
/// Chunked frame delivery.
pub mod transport;
/// Reading recorded wire transcripts.
pub mod wire;

/// Re-export config types.
pub use config::{Delivery, TransportConfig};
/// Re-export error types.
pub use error::{StreamError, StreamResult};
/// Re-export generator types.
pub use generator::{
    GeneratedRound, Generator, RoundInput, RoundRequest, Scene, ScriptedGenerator,
    StaticGenerator, StoryScript,
};
/// Re-export transport types.
pub use transport::{FrameStream, Transport};
/// Re-export wire types.
pub use wire::{WireRound, read_wire};
