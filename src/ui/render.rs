use ratatui::{
    layout::{Constraint, Direction, Layout, Margin},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
    Frame,
};

use crate::app::{App, ConnectionStatus};
use crate::config::{ColorConfig, Config};
use crate::message::Role;
use crate::transcript::{CANCELLED_NOTICE, FAILED_TAG};

use super::gradient::{gradient_color, status_block};
use super::text::{wrap_preserving, wrap_text};

/// Label in front of the input field.
const INPUT_LABEL: &str = "Type Here: ";

/// Main UI rendering function.
pub fn ui(f: &mut Frame, app: &mut App, config: &Config) {
    let colors = &config.colors;
    let (chat_start, chat_end) = colors.chat_gradient();
    let (input_start, input_end) = colors.input_gradient();

    let border_color = Color::Black;
    let bg_color = Color::Rgb(20, 20, 25);

    // Fill entire background with border color to create thick border effect
    let background = Block::default().style(Style::default().bg(border_color));
    f.render_widget(background, f.size());

    // Inner area with margin to create thick border (2 chars on sides, 1 on top/bottom)
    let inner_area = f.size().inner(&Margin {
        horizontal: 2,
        vertical: 1,
    });

    // Dark background for inner content area
    let inner_bg = Block::default().style(Style::default().bg(bg_color));
    f.render_widget(inner_bg, inner_area);

    // Create layout: transcript (top) and input area (bottom)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Transcript
            Constraint::Length(3), // Input box
        ])
        .split(inner_area);

    let text_width = chunks[0].width.saturating_sub(4) as usize;
    let viewport = chunks[0].height.saturating_sub(2) as usize;
    let lines = app
        .transcript
        .with_text(|text| transcript_lines(text, text_width, colors));
    app.scroll.update(lines.len(), viewport);

    // Status indicator for connection
    let queued;
    let (status_text, status_color) = match app.status() {
        ConnectionStatus::NotConfigured => ("● No API Key", Color::Rgb(255, 100, 100)),
        ConnectionStatus::Ready => ("● Ready", Color::Rgb(100, 255, 100)),
        ConnectionStatus::Streaming => ("● Streaming...", Color::Rgb(100, 200, 255)),
        ConnectionStatus::Queued(n) => {
            queued = format!("● Streaming... ({} queued)", n);
            (queued.as_str(), Color::Rgb(100, 200, 255))
        }
        ConnectionStatus::Error => ("● Error", Color::Rgb(255, 100, 100)),
    };

    let title = format!(" relay-chat · {} ", app.model);
    let transcript = Paragraph::new(lines)
        .block(status_block(&title, status_text, status_color, chat_start, chat_end))
        .scroll((app.scroll.offset.min(u16::MAX as usize) as u16, 0));
    f.render_widget(transcript, chunks[0]);

    // Render scrollbar with smooth Unicode characters and gradient
    let scroll_position = if app.scroll.max > 0 {
        app.scroll.offset as f32 / app.scroll.max as f32
    } else {
        1.0
    };

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"))
        .track_symbol(Some("░"))
        .thumb_symbol("█")
        .style(Style::default().fg(gradient_color(chat_start, chat_end, scroll_position)));

    f.render_stateful_widget(
        scrollbar,
        chunks[0].inner(&Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut app.scroll.scrollbar,
    );

    render_input(f, app, chunks[1], input_start, input_end);
}

/// Render the input line with label, blinking cursor and any notice.
fn render_input(
    f: &mut Frame,
    app: &App,
    area: ratatui::layout::Rect,
    start: (u8, u8, u8),
    end: (u8, u8, u8),
) {
    let cursor_char = if app.cursor_visible { "▎" } else { " " };
    let cursor_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::SLOW_BLINK);
    let field_style = Style::default().fg(Color::Green);
    let (before, after) = app.input.text.split_at(app.input.cursor_byte());

    let input_text = Line::from(vec![
        Span::styled(INPUT_LABEL, Style::default().fg(Color::White)),
        Span::styled(before, field_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, field_style),
    ]);

    // Dark grey background, left border only with gradient color
    let mut input_block = Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(gradient_color(start, end, 0.5)))
        .style(Style::default().bg(Color::Rgb(30, 30, 35)));

    if let Some(notice) = &app.notice {
        input_block = input_block.title(Span::styled(
            format!(" {} ", notice.text),
            Style::default().fg(Color::Rgb(255, 200, 100)),
        ));
    }

    let input = Paragraph::new(input_text).block(input_block);
    f.render_widget(input, area);
}

/// Which speaker the following lines belong to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Speaker(Role),
}

fn is_notice(line: &str) -> bool {
    line.starts_with(FAILED_TAG)
        || line.starts_with(CANCELLED_NOTICE)
        || line.starts_with("Config error:")
}

/// Wrap and style the transcript text.
///
/// A line starting with a role prefix opens that speaker's section; following
/// lines keep its color. Failure and cancellation notices are colored on their
/// own.
pub fn transcript_lines(text: &str, width: usize, colors: &ColorConfig) -> Vec<Line<'static>> {
    let user = Style::default().fg(ColorConfig::to_color(&colors.user_text));
    let assistant = Style::default().fg(ColorConfig::to_color(&colors.assistant_text));
    let error = Style::default().fg(ColorConfig::to_color(&colors.error_text));

    let mut section = Section::None;
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let mut style = match section {
            Section::Speaker(Role::User) => user,
            Section::Speaker(Role::Assistant) => assistant,
            Section::None => Style::default(),
        };
        let mut reply_body = false;

        if raw.starts_with(Role::User.prefix()) {
            section = Section::Speaker(Role::User);
            style = user.add_modifier(Modifier::BOLD);
        } else if raw.starts_with(Role::Assistant.prefix().trim_end()) {
            section = Section::Speaker(Role::Assistant);
            style = assistant.add_modifier(Modifier::BOLD);
        } else if is_notice(raw) {
            style = error;
        } else {
            reply_body = section == Section::Speaker(Role::Assistant);
        }

        // Reply text keeps its spacing; headers and notices are reflowed.
        let wrapped = if reply_body {
            wrap_preserving(raw, width)
        } else {
            wrap_text(raw, width)
        };
        for line in wrapped {
            lines.push(Line::from(Span::styled(line, style)));
        }
    }

    lines
}
