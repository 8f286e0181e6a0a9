//! Side effects requested by the sequencer.

use tale_core::{Choice, Segment};
use tale_stream::RoundInput;

/// Something the sequencer asks its owner to do.
///
/// The sequencer never touches sinks itself; the engine applies effects in
/// the order they are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A segment became the active one.
    SegmentActive {
        /// Position in the round.
        index: usize,
        /// The segment.
        segment: Segment,
    },
    /// More of the active segment is visible.
    RevealProgress {
        /// Position in the round.
        index: usize,
        /// Characters now visible.
        visible: usize,
    },
    /// Append a finished segment to history.
    CommitSegment(Segment),
    /// Append a selected choice to history.
    CommitChoice(Choice),
    /// Append free-text input to history.
    CommitInput(String),
    /// Present the decision set.
    Choices(Vec<Choice>),
    /// The round has been played to its end.
    RoundComplete,
    /// Generate the next round.
    RequestRound(RoundInput),
    /// The session was discarded.
    SessionReset,
}
