//! Delivery policy for the transport.

use std::time::Duration;

use serde::Deserialize;

/// How a round's markup is cut into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Random chunk lengths in `[min_chunk, max_chunk]` with a delay between frames.
    #[default]
    Chunked,
    /// The whole markup in one frame, no delay.
    Fast,
}

/// Configuration for a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Smallest chunk length, in characters.
    pub min_chunk: usize,
    /// Largest chunk length, in characters.
    pub max_chunk: usize,
    /// Pause between frames, in milliseconds.
    pub frame_delay_ms: u64,
    /// Chunked or fast delivery.
    pub delivery: Delivery,
    /// RNG seed for reproducible chunk boundaries.
    pub seed: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            min_chunk: 3,
            max_chunk: 12,
            frame_delay_ms: 30,
            delivery: Delivery::Chunked,
            seed: 42,
        }
    }
}

impl TransportConfig {
    /// Set the chunk length range. `min` is raised to 1 and `max` to `min`.
    pub fn with_chunking(mut self, min: usize, max: usize) -> Self {
        self.min_chunk = min.max(1);
        self.max_chunk = max.max(self.min_chunk);
        self
    }

    /// Set the pause between frames.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the delivery mode.
    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Pause between frames.
    pub fn frame_delay(&self) -> Duration {
        match self.delivery {
            Delivery::Chunked => Duration::from_millis(self.frame_delay_ms),
            Delivery::Fast => Duration::ZERO,
        }
    }
}
