use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::widgets::ScrollbarState;
use tracing::{debug, warn};

use crate::config::Config;
use crate::conversation::ConversationLog;
use crate::error::SubmitError;
use crate::lifecycle::LifecycleController;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::transcript::{RenderSink, Transcript, FAILED_TAG};
use crate::turn::{StreamConsumer, TurnDispatcher, TurnSettings, TurnState};

/// How long a status notice stays visible.
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Connection status for the LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not configured (no API key)
    NotConfigured,
    /// Ready to send messages
    Ready,
    /// Currently streaming a response
    Streaming,
    /// Streaming, with more turns waiting
    Queued(usize),
    /// The last turn failed
    Error,
}

/// Single-line input state.
///
/// `cursor` counts characters, not bytes.
#[derive(Debug, Default)]
pub struct InputState {
    /// Current input text
    pub text: String,
    /// Cursor position in characters
    pub cursor: usize,
}

impl InputState {
    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map_or(self.text.len(), |(i, _)| i)
    }

    /// Byte offset of the cursor, for splitting the text when drawing.
    pub fn cursor_byte(&self) -> usize {
        self.byte_index(self.cursor)
    }

    /// Handle a character input.
    pub fn handle_char(&mut self, c: char) {
        let at = self.cursor_byte();
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Handle backspace key.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.text.remove(at);
            self.cursor -= 1;
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    /// Take the text out, leaving the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

/// Scroll-related state for the transcript.
#[derive(Debug)]
pub struct ScrollState {
    /// First visible line
    pub offset: usize,
    /// Largest valid offset for the last drawn frame
    pub max: usize,
    /// Keep the newest output in view
    pub follow: bool,
    /// Scrollbar state for ratatui
    pub scrollbar: ScrollbarState,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            max: 0,
            follow: true,
            scrollbar: ScrollbarState::default(),
        }
    }
}

impl ScrollState {
    /// Scroll up one line.
    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
        self.follow = false;
    }

    /// Scroll down one line.
    pub fn scroll_down(&mut self) {
        self.offset = (self.offset + 1).min(self.max);
        self.follow = self.offset == self.max;
    }

    /// Scroll up by page size.
    pub fn scroll_page_up(&mut self, page_size: usize) {
        self.offset = self.offset.saturating_sub(page_size);
        self.follow = false;
    }

    /// Scroll down by page size.
    pub fn scroll_page_down(&mut self, page_size: usize) {
        self.offset = (self.offset + page_size).min(self.max);
        self.follow = self.offset == self.max;
    }

    /// Scroll to top.
    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    /// Scroll to bottom and keep following new output.
    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max;
        self.follow = true;
    }

    /// Recompute bounds for `total_lines` shown in a `viewport`-line area.
    pub fn update(&mut self, total_lines: usize, viewport: usize) {
        self.max = total_lines.saturating_sub(viewport);
        if self.follow {
            self.offset = self.max;
        }
        self.offset = self.offset.min(self.max);
        self.scrollbar = self.scrollbar.content_length(self.max);
        self.scrollbar = self.scrollbar.position(self.offset);
    }
}

/// A short message shown next to the input box.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub shown_at: Instant,
}

/// Application state for the chat client.
pub struct App {
    /// Input line
    pub input: InputState,
    /// Transcript scroll position
    pub scroll: ScrollState,
    /// Cursor blink visibility state
    pub cursor_visible: bool,
    /// Visible conversation text
    pub transcript: Transcript,
    /// Notice shown next to the input, if any
    pub notice: Option<Notice>,
    /// Model identifier, for the title bar
    pub model: String,
    dispatcher: TurnDispatcher,
    lifecycle: LifecycleController,
    last_status: Option<ConnectionStatus>,
}

impl App {
    /// Build the app from config, constructing the client if the config allows it.
    pub fn new(config: &Config, lifecycle: LifecycleController) -> Self {
        let llm_config = config.llm_config();
        let model = llm_config.model.clone();
        let transcript = Transcript::new();

        let dispatcher = match OpenAiProvider::new(llm_config) {
            Ok(provider) => {
                let settings = TurnSettings {
                    char_delay: config.behavior.char_delay(),
                    idle_timeout: config.behavior.stream_idle_timeout(),
                };
                Self::spawn_dispatcher(
                    Arc::new(provider),
                    transcript.clone(),
                    settings,
                    config.behavior.max_queued_turns,
                    &lifecycle,
                )
            }
            Err(e) => {
                warn!(error = %e, "client not constructed");
                TurnDispatcher::unconfigured(e)
            }
        };

        Self::with_dispatcher(dispatcher, transcript, lifecycle, model)
    }

    /// Start a turn worker over `provider` that renders into `transcript`.
    pub fn spawn_dispatcher(
        provider: Arc<dyn LlmProvider>,
        transcript: Transcript,
        settings: TurnSettings,
        max_queued: usize,
        lifecycle: &LifecycleController,
    ) -> TurnDispatcher {
        let consumer = StreamConsumer::new(provider, ConversationLog::new(), Arc::new(transcript))
            .with_settings(settings);
        TurnDispatcher::spawn(consumer, lifecycle.token(), max_queued)
    }

    /// Build the app around an existing dispatcher.
    pub fn with_dispatcher(
        dispatcher: TurnDispatcher,
        transcript: Transcript,
        lifecycle: LifecycleController,
        model: String,
    ) -> Self {
        let app = Self {
            input: InputState::default(),
            scroll: ScrollState::default(),
            cursor_visible: true,
            transcript,
            notice: None,
            model,
            dispatcher,
            lifecycle,
            last_status: None,
        };
        if let Some(e) = app.dispatcher.config_error() {
            // Surface the problem before the user tries to send anything.
            app.transcript.append(&format!("Config error: {e}\n"));
            app.transcript.request_redraw();
        }
        app
    }

    pub fn dispatcher(&self) -> &TurnDispatcher {
        &self.dispatcher
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Toggle cursor visibility for blinking effect.
    pub fn toggle_cursor(&mut self) {
        self.cursor_visible = !self.cursor_visible;
    }

    /// Submit the current input as a new turn.
    ///
    /// The input is cleared whether or not the turn is accepted.
    pub fn submit_message(&mut self) {
        if self.input.text.trim().is_empty() {
            return;
        }
        let text = self.input.take();
        self.scroll.scroll_to_bottom();

        match self.dispatcher.submit(&text) {
            Ok(id) => debug!(id, "submitted"),
            Err(SubmitError::Config(e)) => {
                // No worker exists in this state, so nothing else writes to the transcript.
                self.transcript.append(&format!("\n{FAILED_TAG}Config error: {e}\n"));
                self.transcript.request_redraw();
            }
            Err(e) => {
                warn!(error = %e, "submission rejected");
                self.show_notice(e.to_string());
            }
        }
    }

    /// Show a notice next to the input box.
    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    /// Drop an expired notice. Returns whether anything changed.
    pub fn expire_notice(&mut self) -> bool {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| n.shown_at.elapsed() >= NOTICE_TTL);
        if expired {
            self.notice = None;
        }
        expired
    }

    /// Current status for the title bar.
    pub fn status(&self) -> ConnectionStatus {
        if !self.dispatcher.is_configured() {
            return ConnectionStatus::NotConfigured;
        }
        let pending = self.dispatcher.pending();
        if pending > 1 {
            return ConnectionStatus::Queued(pending - 1);
        }
        match self.dispatcher.state() {
            state if state.is_active() => ConnectionStatus::Streaming,
            TurnState::Failed if pending == 0 => ConnectionStatus::Error,
            _ if pending > 0 => ConnectionStatus::Streaming,
            _ => ConnectionStatus::Ready,
        }
    }

    /// Whether a turn is running or waiting.
    pub fn is_streaming(&self) -> bool {
        self.dispatcher.pending() > 0
    }

    /// Consume pending redraw reasons: new transcript text or a status change.
    pub fn take_redraw_request(&mut self) -> bool {
        let text_changed = self.transcript.take_redraw_request();
        let status = self.status();
        let status_changed = self.last_status.as_ref() != Some(&status);
        self.last_status = Some(status);
        let notice_changed = self.expire_notice();
        text_changed || status_changed || notice_changed
    }

    /// Handle a character input.
    pub fn handle_char(&mut self, c: char) {
        self.input.handle_char(c);
    }

    /// Handle backspace key.
    pub fn handle_backspace(&mut self) {
        self.input.handle_backspace();
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.input.move_cursor_left();
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        self.input.move_cursor_right();
    }

    /// Stop the app and wait for the turn worker to exit.
    pub async fn finish(self, grace: Duration) {
        self.lifecycle.shutdown();
        if tokio::time::timeout(grace, self.dispatcher.join()).await.is_err() {
            warn!("turn worker did not stop within {:?}", grace);
        }
    }
}
