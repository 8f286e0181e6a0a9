//! The story engine: transport, markup assembly, and playback wired together.

use std::sync::Arc;

use tale_core::{Choice, ContentFrame, ConversationEntry, HistorySink, Segment};
use tale_markup::RoundAssembler;
use tale_stream::{Generator, RoundInput, RoundRequest, StreamError, Transport};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::effect::Effect;
use crate::error::PlaybackResult;
use crate::sequencer::{PlaybackState, Sequencer};
use crate::sink::RenderSink;

/// Where the session as a whole stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been played, or the session was reset.
    Ready,
    /// A round is loaded or being fetched.
    Playing,
    /// The last round ended the story.
    Ended,
    /// The last round could not be delivered.
    Failed(String),
}

/// A fully delivered round, handed to the sequencer as a whole.
#[derive(Debug, Clone)]
struct DeliveredRound {
    segments: Vec<Segment>,
    choices: Vec<Choice>,
}

/// Drives an interactive story.
///
/// The generator, history sink, and render sink are supplied by the caller.
/// Rounds are requested by the sequencer's effects and fetched with
/// [`fetch`](Self::fetch). The sequencer only requests a round once the
/// previous one reached a choice point or its end and playback went idle, so
/// a delivered round always replaces an idle sequencer and a round in
/// progress is never pre-empted.
pub struct StoryEngine<H: HistorySink, R: RenderSink> {
    id: Uuid,
    generator: Arc<dyn Generator>,
    transport: Transport,
    sequencer: Sequencer,
    history: H,
    render: R,
    transcript: Vec<ConversationEntry>,
    requested: Option<RoundInput>,
    session: SessionState,
    rounds: u32,
}

impl<H: HistorySink, R: RenderSink> StoryEngine<H, R> {
    /// Create an engine. Fails if the transport or reveal policy is invalid.
    pub fn new(
        config: EngineConfig,
        generator: Arc<dyn Generator>,
        history: H,
        render: R,
    ) -> PlaybackResult<Self> {
        config.playback.validate()?;
        let transport = Transport::new(config.transport)?;
        Ok(Self {
            id: Uuid::new_v4(),
            generator,
            transport,
            sequencer: Sequencer::new(config.playback),
            history,
            render,
            transcript: Vec::new(),
            requested: None,
            session: SessionState::Ready,
            rounds: 0,
        })
    }

    /// Session id, fresh for every engine.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Playback state of the current round.
    pub fn state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    /// State of the session as a whole.
    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    /// The sequencer, for reading the active segment and choices.
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Entries emitted this session, oldest first. This is the history sent
    /// to the generator and does not depend on the sink accepting them.
    pub fn transcript(&self) -> &[ConversationEntry] {
        &self.transcript
    }

    /// The history sink.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// The render sink.
    pub fn render(&self) -> &R {
        &self.render
    }

    /// Number of rounds delivered this session.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Whether a round has been requested but not yet fetched.
    pub fn has_request(&self) -> bool {
        self.requested.is_some()
    }

    /// Free-text input. Starts the session, or answers a choice point.
    pub fn say(&mut self, text: &str) -> PlaybackResult<()> {
        let effects = self.sequencer.submit_text(text)?;
        self.apply(effects);
        Ok(())
    }

    /// Select a choice by id.
    pub fn choose(&mut self, id: &str) -> PlaybackResult<()> {
        let effects = self.sequencer.choose(id)?;
        self.apply(effects);
        Ok(())
    }

    /// Reveal timer fired.
    pub fn tick(&mut self) {
        let effects = self.sequencer.tick();
        self.apply(effects);
    }

    /// Reveal the active segment at once.
    pub fn skip(&mut self) -> PlaybackResult<()> {
        let effects = self.sequencer.skip()?;
        self.apply(effects);
        Ok(())
    }

    /// Move past the fully revealed segment.
    pub fn advance(&mut self) -> PlaybackResult<()> {
        let effects = self.sequencer.advance()?;
        self.apply(effects);
        Ok(())
    }

    /// Skip if revealing, otherwise advance.
    pub fn proceed(&mut self) -> PlaybackResult<()> {
        let effects = self.sequencer.proceed()?;
        self.apply(effects);
        Ok(())
    }

    /// Discard everything and return to the pre-session state. Entries
    /// already handed to the history sink stay there.
    pub fn reset(&mut self) {
        let effects = self.sequencer.reset();
        self.apply(effects);
    }

    /// Deliver the requested round, if any, and load it.
    ///
    /// Without a request this does nothing, so calling it mid-round leaves
    /// the round in progress untouched.
    ///
    /// On transport failure nothing from the partial round is kept, the
    /// session moves to [`SessionState::Failed`], and earlier history is untouched.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub async fn fetch(&mut self) -> PlaybackResult<()> {
        let Some(input) = self.requested.take() else {
            return Ok(());
        };
        self.session = SessionState::Playing;
        match self.deliver(input).await {
            Ok(round) => {
                self.rounds += 1;
                let effects = self.sequencer.load(round.segments, round.choices)?;
                self.apply(effects);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "round failed");
                self.session = SessionState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    async fn deliver(&mut self, input: RoundInput) -> Result<DeliveredRound, StreamError> {
        let request = RoundRequest::new(input).with_history(self.transcript.clone());
        let mut stream = self.transport.start(Arc::clone(&self.generator), request);
        let mut assembler = RoundAssembler::new();

        let choices = loop {
            match stream.recv().await {
                Some(Ok(ContentFrame::Content { payload })) => {
                    let ready = assembler.push(&payload).len();
                    tracing::trace!(len = payload.len(), ready, "frame received");
                }
                Some(Ok(ContentFrame::Complete { choices })) => break choices,
                Some(Err(e)) => return Err(e),
                None => return Err(StreamError::Aborted),
            }
        };

        let round = assembler.finish();
        if !round.diagnostics.is_empty() {
            tracing::debug!(count = round.diagnostics.len(), "markup recovered with diagnostics");
        }
        Ok(DeliveredRound {
            segments: round.segments,
            choices,
        })
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SegmentActive { segment, .. } => self.render.on_segment_active(&segment),
                Effect::RevealProgress { .. } => {
                    if let Some(segment) = self.sequencer.active() {
                        self.render.on_reveal(segment, self.sequencer.visible_text());
                    }
                }
                Effect::CommitSegment(segment) => self.record(ConversationEntry::segment(segment)),
                Effect::CommitChoice(choice) => self.record(ConversationEntry::choice(choice)),
                Effect::CommitInput(text) => self.record(ConversationEntry::user_input(text)),
                Effect::Choices(choices) => self.render.on_choices(&choices),
                Effect::RoundComplete => {
                    if self.sequencer.state() == PlaybackState::Complete {
                        self.session = SessionState::Ended;
                    }
                    self.render.on_round_complete();
                }
                Effect::RequestRound(input) => self.requested = Some(input),
                Effect::SessionReset => {
                    self.transcript.clear();
                    self.requested = None;
                    self.session = SessionState::Ready;
                    self.rounds = 0;
                }
            }
        }
    }

    fn record(&mut self, entry: ConversationEntry) {
        self.transcript.push(entry.clone());
        if let Err(e) = self.history.append(entry) {
            tracing::warn!(error = %e, "history append failed; playback continues");
        }
    }
}

impl<H: HistorySink, R: RenderSink> std::fmt::Debug for StoryEngine<H, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("id", &self.id)
            .field("state", &self.sequencer.state())
            .field("session", &self.session)
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

