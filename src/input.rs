use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};

use crate::app::App;
use crate::config::Config;
use crate::ui;

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum HandleResult {
    /// Continue running the app
    Continue,
    /// Exit the app
    Exit,
}

/// Cursor blink interval in milliseconds.
const CURSOR_BLINK_MS: u64 = 530;

/// Run the main application loop until the user quits or shutdown is requested.
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> io::Result<()> {
    let behavior = &config.behavior;
    let mut last_cursor_toggle = Instant::now();
    let mut needs_draw = true;

    loop {
        if app.lifecycle().is_shutting_down() {
            return Ok(());
        }

        needs_draw |= app.take_redraw_request();
        if needs_draw {
            terminal.draw(|f| ui::ui(f, app, config))?;
            needs_draw = false;
        }

        // Toggle cursor blink
        if last_cursor_toggle.elapsed() >= Duration::from_millis(CURSOR_BLINK_MS) {
            app.toggle_cursor();
            last_cursor_toggle = Instant::now();
            needs_draw = true;
        }

        // Fast polling while a reply is streaming, slower when idle
        let timeout = if app.is_streaming() {
            Duration::from_millis(behavior.animation_frame_ms)
        } else {
            Duration::from_millis(behavior.idle_poll_ms)
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Reset cursor to visible on any keypress
                    app.cursor_visible = true;
                    last_cursor_toggle = Instant::now();
                    needs_draw = true;

                    let result = handle_key_event(app, key.code, key.modifiers, config);
                    if result == HandleResult::Exit {
                        app.lifecycle().shutdown();
                        return Ok(());
                    }
                }
            } else {
                // Resize and other events only need a fresh frame.
                needs_draw = true;
            }
        }
    }
}

/// Handle a key event and return whether to continue or exit.
pub fn handle_key_event(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    config: &Config,
) -> HandleResult {
    let page_size = config.behavior.scroll_page_size;

    match code {
        KeyCode::Char('c') | KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            return HandleResult::Exit;
        }
        KeyCode::Enter => {
            app.submit_message();
        }
        KeyCode::Char(c) => {
            app.handle_char(c);
        }
        KeyCode::Backspace => {
            app.handle_backspace();
        }
        KeyCode::Left => {
            app.move_cursor_left();
        }
        KeyCode::Right => {
            app.move_cursor_right();
        }
        KeyCode::Up => {
            app.scroll.scroll_up();
        }
        KeyCode::Down => {
            app.scroll.scroll_down();
        }
        KeyCode::PageUp => {
            app.scroll.scroll_page_up(page_size);
        }
        KeyCode::PageDown => {
            app.scroll.scroll_page_down(page_size);
        }
        KeyCode::Home => {
            app.scroll.scroll_to_top();
        }
        KeyCode::End => {
            app.scroll.scroll_to_bottom();
        }
        KeyCode::Esc => {
            return HandleResult::Exit;
        }
        _ => {}
    }
    HandleResult::Continue
}
