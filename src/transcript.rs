//! The visible conversation text and the redraw requests that go with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tag written in front of an error that ended a turn.
pub const FAILED_TAG: &str = "[turn failed] ";

/// Notice written when a turn is interrupted by shutdown.
pub const CANCELLED_NOTICE: &str = "[turn cancelled]";

/// Surface that turns write their output to.
pub trait RenderSink: Send + Sync {
    /// Current full text.
    fn text(&self) -> String;

    /// Replace the full text.
    fn set_text(&self, text: String);

    /// Append to the end of the text.
    fn append(&self, s: &str) {
        let mut text = self.text();
        text.push_str(s);
        self.set_text(text);
    }

    /// Ask the display to redraw as soon as it can.
    fn request_redraw(&self);
}

/// Shared text buffer read by the draw loop.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    text: Arc<Mutex<String>>,
    dirty: Arc<AtomicBool>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Visible length in bytes.
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// Run `f` against the text without copying it.
    pub fn with_text<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.buffer())
    }

    /// Consume a pending redraw request, if any.
    pub fn take_redraw_request(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl RenderSink for Transcript {
    fn text(&self) -> String {
        self.buffer().clone()
    }

    fn set_text(&self, text: String) {
        *self.buffer() = text;
        self.request_redraw();
    }

    fn append(&self, s: &str) {
        self.buffer().push_str(s);
    }

    fn request_redraw(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}
