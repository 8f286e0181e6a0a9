//! Append-only conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::error::CoreResult;
use crate::segment::Segment;

/// A single record in the conversation history. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversationEntry {
    /// Free text typed by the player.
    UserInput {
        /// What the player typed.
        text: String,
        /// When it was entered.
        timestamp: DateTime<Utc>,
    },
    /// A choice the player selected.
    ChoiceSelected {
        /// The selected choice.
        choice: Choice,
        /// When it was selected.
        timestamp: DateTime<Utc>,
    },
    /// A segment the player read to the end and advanced past.
    Segment {
        /// The completed segment.
        segment: Segment,
        /// When it was committed.
        timestamp: DateTime<Utc>,
    },
}

impl ConversationEntry {
    /// Record free-text input, stamped now.
    pub fn user_input(text: impl Into<String>) -> Self {
        Self::UserInput {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Record a choice selection, stamped now.
    pub fn choice(choice: Choice) -> Self {
        Self::ChoiceSelected {
            choice,
            timestamp: Utc::now(),
        }
    }

    /// Record a completed segment, stamped now.
    pub fn segment(segment: Segment) -> Self {
        Self::Segment {
            segment,
            timestamp: Utc::now(),
        }
    }

    /// When the entry was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UserInput { timestamp, .. }
            | Self::ChoiceSelected { timestamp, .. }
            | Self::Segment { timestamp, .. } => *timestamp,
        }
    }

    /// The segment, if this entry records one.
    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Self::Segment { segment, .. } => Some(segment),
            _ => None,
        }
    }
}

/// Write side of the history collaborator.
///
/// Failures must be returned, never dropped; the caller decides whether they
/// are fatal.
pub trait HistorySink {
    /// Append one entry to the log.
    fn append(&mut self, entry: ConversationEntry) -> CoreResult<()>;
}

/// An in-memory chronological log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryHistory {
    entries: Vec<ConversationEntry>,
}

impl MemoryHistory {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Committed segments, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.entries.iter().filter_map(ConversationEntry::as_segment)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HistorySink for MemoryHistory {
    fn append(&mut self, entry: ConversationEntry) -> CoreResult<()> {
        self.entries.push(entry);
        Ok(())
    }
}
