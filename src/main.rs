//! relay-chat - a terminal chat client that streams replies as they are typed.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use relay_chat::app::App;
use relay_chat::config::Config;
use relay_chat::lifecycle::LifecycleController;
use relay_chat::{input, logging};

/// How long shutdown waits for an in-flight turn to notice cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Logging is best-effort; the client works without it.
    if let Err(e) = logging::init() {
        eprintln!("Warning: file logging disabled: {e:#}");
    }

    // Load configuration
    let config = Config::load();

    let lifecycle = LifecycleController::new();
    let signals = lifecycle.listen_for_signals();

    // Create app
    let mut app = App::new(&config, lifecycle.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app; the loop blocks on terminal input, so keep it off the async workers.
    let res = tokio::task::block_in_place(|| input::run_app(&mut terminal, &mut app, &config));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.finish(SHUTDOWN_GRACE).await;
    signals.abort();

    // A failing render loop is the only fatal error.
    if let Err(err) = res {
        tracing::error!(error = %err, "render loop failed");
        return Err(err.into());
    }

    Ok(())
}
