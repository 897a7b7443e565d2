//! In-memory provider and sinks shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_chat::llm::{ChatMessage, LlmProvider, ProviderError, ProviderResult, StreamEvent};
use relay_chat::transcript::{RenderSink, Transcript};
use tokio::sync::mpsc;

/// One step of a scripted reply.
#[derive(Debug, Clone)]
pub enum Step {
    Token(&'static str),
    Done,
    Fail(ProviderError),
    /// Keep the stream open, sending nothing, until the consumer drops it.
    Hang,
}

/// What a single request gets back.
pub type Script = Result<Vec<Step>, ProviderError>;

/// Provider that answers each request with the next queued script.
///
/// Requests beyond the queued scripts get an empty, successful reply.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Script replying with the given text in one fragment per entry.
    pub fn reply(fragments: &[&'static str]) -> Script {
        let mut steps: Vec<Step> = fragments.iter().copied().map(Step::Token).collect();
        steps.push(Step::Done);
        Ok(steps)
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> ProviderResult<mpsc::Receiver<StreamEvent>> {
        self.requests.lock().unwrap().push(messages);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![Step::Done]));
        let steps = script?;

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for step in steps {
                let event = match step {
                    Step::Token(text) => StreamEvent::Token(text.to_string()),
                    Step::Done => StreamEvent::Done,
                    Step::Fail(e) => StreamEvent::Error(e),
                    Step::Hang => {
                        tx.closed().await;
                        return;
                    }
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// Sink that checks every write only ever extends the text.
#[derive(Default)]
pub struct GrowthCheckingSink {
    inner: Transcript,
    violations: Mutex<Vec<String>>,
}

impl GrowthCheckingSink {
    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        self.inner.text()
    }
}

impl RenderSink for GrowthCheckingSink {
    fn text(&self) -> String {
        self.inner.text()
    }

    fn set_text(&self, text: String) {
        let before = self.inner.text();
        if !text.starts_with(&before) {
            self.violations
                .lock()
                .unwrap()
                .push(format!("{before:?} -> {text:?}"));
        }
        self.inner.set_text(text);
    }

    fn request_redraw(&self) {
        self.inner.request_redraw();
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
