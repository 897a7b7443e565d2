//! Execution of a single turn: request, stream, render, commit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::{to_chat_messages, ConversationLog};
use crate::error::TurnError;
use crate::llm::{ChatMessage, LlmProvider, ProviderError, StreamEvent};
use crate::message::{Message, Role};
use crate::transcript::{RenderSink, CANCELLED_NOTICE, FAILED_TAG};

/// Where the most recent turn is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Request is being established.
    Sending,
    /// Reply fragments are arriving.
    Streaming,
    /// Reply was appended to the log.
    Committed,
    /// Request or stream failed.
    Failed,
    /// Interrupted by shutdown.
    Cancelled,
}

impl TurnState {
    /// Whether a turn is between `Sending` and a terminal state.
    pub fn is_active(&self) -> bool {
        matches!(self, TurnState::Sending | TurnState::Streaming)
    }
}

/// Pacing and timeout knobs for a turn.
#[derive(Debug, Clone, Default)]
pub struct TurnSettings {
    /// Pause after each rendered character.
    pub char_delay: Option<Duration>,
    /// Longest wait for the next fragment before the turn fails.
    pub idle_timeout: Option<Duration>,
}

/// State owned by one in-flight turn.
struct TurnSession {
    /// Log snapshot plus the new user message, in wire format.
    request: Vec<ChatMessage>,
    user: Message,
    reply: String,
}

impl TurnSession {
    fn begin(log: &ConversationLog, input: &str) -> Self {
        let user = Message::user(input);
        let mut context = log.snapshot();
        context.push(user.clone());
        Self {
            request: to_chat_messages(&context),
            user,
            reply: String::new(),
        }
    }
}

/// Drives turns against a provider, mirroring the reply into a render sink.
pub struct StreamConsumer {
    provider: Arc<dyn LlmProvider>,
    log: ConversationLog,
    sink: Arc<dyn RenderSink>,
    settings: TurnSettings,
    state: watch::Sender<TurnState>,
}

impl StreamConsumer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        log: ConversationLog,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let (state, _) = watch::channel(TurnState::Idle);
        Self {
            provider,
            log,
            sink,
            settings: TurnSettings::default(),
            state,
        }
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Observe state transitions of the turns this consumer runs.
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Run one turn to completion and return the committed reply.
    ///
    /// Errors have already been rendered inline when this returns; the caller
    /// only needs the result for bookkeeping.
    pub async fn run(&self, input: &str, cancel: &CancellationToken) -> Result<String, TurnError> {
        self.set_state(TurnState::Sending);
        self.render(&format!("\n{}{}", Role::User.prefix(), input));
        let mut session = TurnSession::begin(&self.log, input);
        debug!(
            model = self.provider.model(),
            context = session.request.len(),
            "turn started"
        );

        match self.stream_reply(&mut session, cancel).await {
            Ok(()) => Ok(self.commit(session)),
            Err(err) => {
                self.abandon(session, &err);
                Err(err)
            }
        }
    }

    async fn stream_reply(
        &self,
        session: &mut TurnSession,
        cancel: &CancellationToken,
    ) -> Result<(), TurnError> {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            opened = self.provider.open_stream(session.request.clone()) => opened,
        };
        let mut rx = opened.map_err(TurnError::StreamInit)?;

        self.set_state(TurnState::Streaming);
        self.render(&format!("\n{}\n", Role::Assistant.prefix()));

        loop {
            match self.next_event(&mut rx, cancel).await? {
                StreamEvent::Token(text) => {
                    for ch in text.chars() {
                        self.type_char(session, ch, cancel).await?;
                    }
                }
                StreamEvent::Done => return Ok(()),
                StreamEvent::Error(e) => return Err(TurnError::StreamRecv(e)),
            }
        }
    }

    async fn next_event(
        &self,
        rx: &mut mpsc::Receiver<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<StreamEvent, TurnError> {
        let idle_timeout = self.settings.idle_timeout;
        let recv = async {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, rx.recv())
                    .await
                    .map_err(|_| TurnError::StreamRecv(ProviderError::IdleTimeout(limit))),
                None => Ok(rx.recv().await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            event = recv => event?.ok_or_else(|| {
                TurnError::StreamRecv(ProviderError::Other(
                    "stream closed before completion".to_string(),
                ))
            }),
        }
    }

    /// Apply one reply character: session buffer first, then the visible text.
    async fn type_char(
        &self,
        session: &mut TurnSession,
        ch: char,
        cancel: &CancellationToken,
    ) -> Result<(), TurnError> {
        session.reply.push(ch);
        let mut utf8 = [0u8; 4];
        self.sink.append(ch.encode_utf8(&mut utf8));
        self.sink.request_redraw();

        if let Some(delay) = self.settings.char_delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(())
    }

    fn commit(&self, session: TurnSession) -> String {
        let TurnSession { user, reply, .. } = session;
        let log_len = self.log.append_pair(user, Message::assistant(reply.clone()));
        self.render("\n");
        self.set_state(TurnState::Committed);
        info!(log_len, reply_chars = reply.chars().count(), "turn committed");
        reply
    }

    fn abandon(&self, session: TurnSession, err: &TurnError) {
        if let TurnError::Cancelled = err {
            self.render(&format!("\n{CANCELLED_NOTICE}\n"));
            self.set_state(TurnState::Cancelled);
            info!(partial_chars = session.reply.chars().count(), "turn cancelled");
            return;
        }

        self.render(&format!("\n{FAILED_TAG}{err}\n"));
        if err.request_was_sent() {
            // The remote side saw the user message, so history keeps it, paired with a marker.
            let log_len = self
                .log
                .append_pair(session.user, Message::failed_turn(err.to_string()));
            warn!(error = %err, log_len, "turn failed mid-stream");
        } else {
            warn!(error = %err, "turn failed before streaming");
        }
        self.set_state(TurnState::Failed);
    }

    fn render(&self, text: &str) {
        self.sink.append(text);
        self.sink.request_redraw();
    }

    fn set_state(&self, state: TurnState) {
        self.state.send_replace(state);
    }
}
