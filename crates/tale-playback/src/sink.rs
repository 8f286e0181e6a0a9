//! The rendering collaborator.

use tale_core::{Choice, Segment};

/// Receives what the player should see. Implemented by a UI or a test fake.
pub trait RenderSink {
    /// A segment became active.
    fn on_segment_active(&mut self, segment: &Segment);

    /// The decision set is ready.
    fn on_choices(&mut self, choices: &[Choice]);

    /// The round was played to its end.
    fn on_round_complete(&mut self);

    /// More of the active segment is visible. Used for typewriter effects.
    fn on_reveal(&mut self, _segment: &Segment, _visible: &str) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRender;

impl RenderSink for NullRender {
    fn on_segment_active(&mut self, _segment: &Segment) {}

    fn on_choices(&mut self, _choices: &[Choice]) {}

    fn on_round_complete(&mut self) {}
}
