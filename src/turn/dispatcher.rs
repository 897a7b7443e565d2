//! Admission of submitted messages into a single, ordered turn worker.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use super::{StreamConsumer, TurnState};
use crate::error::{ConfigError, SubmitError};

/// One accepted submission waiting for the worker.
#[derive(Debug)]
struct Submission {
    id: u64,
    text: String,
}

/// Accepts submissions and runs them one at a time, in order.
///
/// Each turn takes its log snapshot only when it starts, so a queued turn
/// always sees the exchanges committed by the turns ahead of it.
pub struct TurnDispatcher {
    queue: Result<mpsc::Sender<Submission>, ConfigError>,
    next_id: u64,
    pending: Arc<watch::Sender<usize>>,
    state: watch::Receiver<TurnState>,
    worker: Option<JoinHandle<()>>,
}

impl TurnDispatcher {
    /// Start the turn worker.
    ///
    /// At most `max_queued` turns wait behind the running one. The worker stops
    /// when `shutdown` fires, and every turn runs under a child of it.
    pub fn spawn(consumer: StreamConsumer, shutdown: CancellationToken, max_queued: usize) -> Self {
        let (tx, rx) = mpsc::channel(max_queued.max(1));
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);
        let state = consumer.subscribe();

        let worker = tokio::spawn(serve(consumer, rx, shutdown, pending.clone()));

        Self {
            queue: Ok(tx),
            next_id: 1,
            pending,
            state,
            worker: Some(worker),
        }
    }

    /// A dispatcher with no client behind it; every submission fails with `error`.
    pub fn unconfigured(error: ConfigError) -> Self {
        let (pending, _) = watch::channel(0usize);
        let (_, state) = watch::channel(TurnState::Idle);
        Self {
            queue: Err(error),
            next_id: 1,
            pending: Arc::new(pending),
            state,
            worker: None,
        }
    }

    /// Whether submissions can reach a client.
    pub fn is_configured(&self) -> bool {
        self.queue.is_ok()
    }

    /// The configuration problem, if any.
    pub fn config_error(&self) -> Option<&ConfigError> {
        self.queue.as_ref().err()
    }

    /// Queue `text` as a new turn and return its id.
    pub fn submit(&mut self, text: &str) -> Result<u64, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }
        let queue = self.queue.as_ref().map_err(|e| SubmitError::Config(e.clone()))?;

        let id = self.next_id;
        self.pending.send_modify(|n| *n += 1);
        let submission = Submission {
            id,
            text: text.to_string(),
        };

        match queue.try_send(submission) {
            Ok(()) => {
                self.next_id += 1;
                debug!(id, pending = self.pending(), "turn queued");
                Ok(id)
            }
            Err(err) => {
                self.pending.send_modify(|n| *n -= 1);
                match err {
                    mpsc::error::TrySendError::Full(_) => Err(SubmitError::Busy(self.pending())),
                    mpsc::error::TrySendError::Closed(_) => Err(SubmitError::Closed),
                }
            }
        }
    }

    /// Turns accepted but not yet finished, including the running one.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// State of the most recent turn.
    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Wait until every accepted turn has finished.
    pub async fn wait_idle(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = pending.wait_for(|n| *n == 0).await;
    }

    /// Wait for the worker to exit after shutdown.
    pub async fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "turn worker panicked");
            }
        }
    }
}

async fn serve(
    consumer: StreamConsumer,
    mut rx: mpsc::Receiver<Submission>,
    shutdown: CancellationToken,
    pending: Arc<watch::Sender<usize>>,
) {
    loop {
        let submission = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = rx.recv() => match next {
                Some(submission) => submission,
                None => break,
            },
        };

        let turn_token = shutdown.child_token();
        let span = info_span!("turn", id = submission.id);
        let _ = consumer
            .run(&submission.text, &turn_token)
            .instrument(span)
            .await;
        pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    rx.close();
    let dropped = pending.send_replace(0);
    info!(dropped, "turn worker stopped");
}
