//! Process-level start/stop.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the root cancellation token every turn derives from.
#[derive(Clone, Debug, Default)]
pub struct LifecycleController {
    token: CancellationToken,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root token. Turns should use [`CancellationToken::child_token`] of it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }

    /// Trigger shutdown on SIGINT or SIGTERM.
    ///
    /// The listener exits on its own once shutdown happens for another reason.
    /// In raw mode Ctrl+C arrives as a key event instead, see `input::handle_key_event`.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = controller.stopped() => {}
                signal = wait_for_signal() => match signal {
                    Ok(name) => {
                        info!(signal = name, "received interrupt");
                        controller.shutdown();
                    }
                    Err(e) => warn!(error = %e, "could not install signal handlers"),
                },
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_cancels_children() {
        let lifecycle = LifecycleController::new();
        let turn = lifecycle.token().child_token();
        assert!(!lifecycle.is_shutting_down());

        lifecycle.shutdown();
        assert!(lifecycle.is_shutting_down());
        assert!(turn.is_cancelled());

        // Second call is a no-op.
        lifecycle.shutdown();
        assert!(lifecycle.is_shutting_down());
    }

    #[test]
    fn test_clones_share_state() {
        let lifecycle = LifecycleController::new();
        let other = lifecycle.clone();
        other.shutdown();
        assert!(lifecycle.is_shutting_down());
    }

    #[tokio::test]
    async fn test_signal_listener_exits_after_shutdown() {
        let lifecycle = LifecycleController::new();
        let listener = lifecycle.listen_for_signals();
        lifecycle.shutdown();
        listener.await.unwrap();
    }
}
