//! Frame delivery: generator output cut into content frames plus one terminal frame.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tale_core::ContentFrame;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Delivery, TransportConfig};
use crate::error::{StreamError, StreamResult};
use crate::generator::{Generator, RoundRequest};

const CHANNEL_CAPACITY: usize = 64;

/// Delivers rounds as frames according to a [`TransportConfig`].
#[derive(Debug)]
pub struct Transport {
    config: TransportConfig,
    rng: StdRng,
}

impl Transport {
    /// Create a transport. Fails when the chunk range is empty or starts at zero.
    pub fn new(config: TransportConfig) -> StreamResult<Self> {
        if config.min_chunk == 0 || config.max_chunk < config.min_chunk {
            return Err(StreamError::InvalidChunking {
                min: config.min_chunk,
                max: config.max_chunk,
            });
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    /// The active configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Cut `markup` into frame payloads without generating or delivering anything.
    pub fn split_markup(&mut self, markup: &str) -> Vec<String> {
        split_chunks(markup, &self.config, &mut self.rng)
    }

    /// Generate one round in the background and stream its frames.
    ///
    /// Frames arrive in order: content frames, then the terminal frame. If
    /// the generator fails, the stream yields that error and nothing else.
    pub fn start(&mut self, generator: Arc<dyn Generator>, request: RoundRequest) -> FrameStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let config = self.config.clone();
        let seed: u64 = self.rng.random();
        let task = tokio::spawn(deliver(generator, request, config, seed, tx));
        FrameStream {
            rx,
            task,
            finished: false,
        }
    }
}

async fn deliver(
    generator: Arc<dyn Generator>,
    request: RoundRequest,
    config: TransportConfig,
    seed: u64,
    tx: mpsc::Sender<StreamResult<ContentFrame>>,
) {
    let round = match generator.generate(&request).await {
        Ok(round) => round,
        Err(e) => {
            tracing::warn!(error = %e, "generator failed; round aborted");
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let chunks = split_chunks(&round.markup, &config, &mut rng);
    let delay = config.frame_delay();
    tracing::debug!(frames = chunks.len(), chars = round.markup.chars().count(), "delivering round");

    for chunk in chunks {
        if tx.send(Ok(ContentFrame::content(chunk))).await.is_err() {
            tracing::debug!("frame receiver dropped");
            return;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    let _ = tx.send(Ok(ContentFrame::complete(round.choices))).await;
}

fn split_chunks(markup: &str, config: &TransportConfig, rng: &mut StdRng) -> Vec<String> {
    if config.delivery == Delivery::Fast || markup.is_empty() {
        return vec![markup.to_string()];
    }
    let chars: Vec<char> = markup.chars().collect();
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let len = rng.random_range(config.min_chunk..=config.max_chunk);
        let end = (pos + len).min(chars.len());
        chunks.push(chars[pos..end].iter().collect());
        pos = end;
    }
    chunks
}

/// Receiving end of one round's frames.
///
/// Dropping the stream aborts delivery.
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::Receiver<StreamResult<ContentFrame>>,
    task: JoinHandle<()>,
    finished: bool,
}

impl FrameStream {
    /// Next frame, or `None` once the terminal frame or an error has been yielded.
    ///
    /// A sender that goes away before the terminal frame yields [`StreamError::Aborted`].
    pub async fn recv(&mut self) -> Option<StreamResult<ContentFrame>> {
        if self.finished {
            return None;
        }
        let item = match self.rx.recv().await {
            Some(item) => item,
            None => Err(StreamError::Aborted),
        };
        if !matches!(item, Ok(ContentFrame::Content { .. })) {
            self.finished = true;
        }
        Some(item)
    }

    /// Stop delivery. Later calls to [`recv`](Self::recv) return `None`.
    pub fn abort(&mut self) {
        self.task.abort();
        self.rx.close();
        self.finished = true;
    }

    /// Whether the stream has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the whole round.
    pub async fn collect(mut self) -> StreamResult<Vec<ContentFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.recv().await {
            frames.push(frame?);
        }
        Ok(frames)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::generator::{GeneratedRound, RoundInput, StaticGenerator};
    use async_trait::async_trait;
    use tale_core::Choice;

    const MARKUP: &str = "<Narrator>A door creaks.</Narrator><character name=\"Ari\"><say>Hé!</say></character>";

    fn quick() -> TransportConfig {
        TransportConfig::default().with_frame_delay(Duration::ZERO)
    }

    fn request() -> RoundRequest {
        RoundRequest::new(RoundInput::Utterance("look".into()))
    }

    fn payloads(frames: &[ContentFrame]) -> String {
        frames
            .iter()
            .filter_map(|f| match f {
                ContentFrame::Content { payload } => Some(payload.as_str()),
                ContentFrame::Complete { .. } => None,
            })
            .collect()
    }

    struct Failing;

    #[async_trait]
    impl Generator for Failing {
        async fn generate(&self, _request: &RoundRequest) -> StreamResult<GeneratedRound> {
            Err(StreamError::Generator("model offline".into()))
        }
    }

    #[test]
    fn rejects_bad_chunking() {
        let cfg = TransportConfig {
            min_chunk: 5,
            max_chunk: 2,
            ..TransportConfig::default()
        };
        assert!(matches!(
            Transport::new(cfg.clone()),
            Err(StreamError::InvalidChunking { min: 5, max: 2 })
        ));
        let cfg = TransportConfig { min_chunk: 0, ..cfg };
        assert!(Transport::new(cfg).is_err());
    }

    #[test]
    fn chunks_respect_bounds() {
        let mut transport = Transport::new(quick().with_chunking(2, 5)).unwrap();
        let chunks = transport.split_markup(MARKUP);
        assert_eq!(chunks.concat(), MARKUP);
        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            let n = chunk.chars().count();
            assert!((2..=5).contains(&n), "chunk {chunk:?} has {n} chars");
        }
        assert!(last.chars().count() <= 5);
    }

    #[test]
    fn same_seed_same_boundaries() {
        let mut a = Transport::new(quick().with_seed(9)).unwrap();
        let mut b = Transport::new(quick().with_seed(9)).unwrap();
        assert_eq!(a.split_markup(MARKUP), b.split_markup(MARKUP));
    }

    #[test]
    fn fast_and_empty_give_one_frame() {
        let mut fast = Transport::new(quick().with_delivery(Delivery::Fast)).unwrap();
        assert_eq!(fast.split_markup(MARKUP), vec![MARKUP.to_string()]);
        let mut chunked = Transport::new(quick()).unwrap();
        assert_eq!(chunked.split_markup(""), vec![String::new()]);
    }

    #[tokio::test]
    async fn delivers_content_then_complete() {
        let choices = vec![Choice::new("enter", "Step inside")];
        let generator = Arc::new(StaticGenerator::new(MARKUP, choices.clone()));
        let mut transport = Transport::new(quick()).unwrap();
        let frames = transport.start(generator, request()).collect().await.unwrap();

        assert_eq!(payloads(&frames), MARKUP);
        assert_eq!(frames.iter().filter(|f| f.is_complete()).count(), 1);
        assert_eq!(frames.last(), Some(&ContentFrame::complete(choices)));
    }

    #[tokio::test]
    async fn generator_failure_yields_no_complete() {
        let mut transport = Transport::new(quick()).unwrap();
        let mut stream = transport.start(Arc::new(Failing), request());
        assert!(matches!(
            stream.recv().await,
            Some(Err(StreamError::Generator(_)))
        ));
        assert!(stream.recv().await.is_none());
        assert!(stream.is_finished());
    }

    #[tokio::test]
    async fn abort_stops_delivery() {
        let generator = Arc::new(StaticGenerator::new(MARKUP, Vec::new()));
        let mut transport = Transport::new(
            TransportConfig::default()
                .with_chunking(1, 1)
                .with_frame_delay(Duration::from_millis(5)),
        )
        .unwrap();
        let mut stream = transport.start(generator, request());
        assert!(matches!(stream.recv().await, Some(Ok(ContentFrame::Content { .. }))));
        stream.abort();
        assert!(stream.recv().await.is_none());
    }
}
