use aurora_core::{ContentBlock, Role};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::app::{AppMode, ChatApp, Theme};

const BRAND: &str = "AURORA⁺";

struct Palette {
    background: Color,
    text: Color,
    muted: Color,
    user: Color,
    assistant: Color,
    accent: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            background: Color::Black,
            text: Color::White,
            muted: Color::DarkGray,
            user: Color::Green,
            assistant: Color::Magenta,
            accent: Color::Cyan,
        },
        Theme::Light => Palette {
            background: Color::White,
            text: Color::Black,
            muted: Color::Gray,
            user: Color::Blue,
            assistant: Color::Magenta,
            accent: Color::LightMagenta,
        },
    }
}

pub fn render(frame: &mut Frame, app: &ChatApp) {
    let colors = palette(app.theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(colors.background).fg(colors.text)),
        frame.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(1),    // Messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, &colors, chunks[0]);
    render_messages(frame, app, &colors, chunks[1]);
    render_input(frame, app, &colors, chunks[2]);
    render_status_bar(frame, app, &colors, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &ChatApp, colors: &Palette, area: Rect) {
    let title = format!("{} · {}", BRAND, app.model);
    let header =
        Paragraph::new(title).style(Style::default().fg(colors.accent).add_modifier(Modifier::BOLD));

    frame.render_widget(header, area);
}

fn block_lines<'a>(block: &'a ContentBlock, colors: &Palette) -> Vec<Line<'a>> {
    match block {
        ContentBlock::Text { markdown } => markdown
            .lines()
            .map(|line| Line::from(format!("  {}", line)))
            .collect(),
        ContentBlock::Image { url, alt } => vec![Line::from(vec![
            Span::styled(format!("  [gif: {}] ", alt), Style::default().fg(colors.accent)),
            Span::styled(url.as_str(), Style::default().fg(colors.muted)),
        ])],
        ContentBlock::Embed { .. } => vec![Line::from(Span::styled(
            format!("  ♪ {}", block.embed_url().unwrap_or_default()),
            Style::default().fg(colors.accent),
        ))],
    }
}

fn render_messages(frame: &mut Frame, app: &ChatApp, colors: &Palette, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for msg in &app.rendered {
        let (label, color) = match msg.role {
            Role::User => ("You", colors.user),
            Role::Assistant => (BRAND, colors.assistant),
            Role::System => continue,
        };

        lines.push(Line::from(Span::styled(
            format!("{}:", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        for block in &msg.blocks {
            lines.extend(block_lines(block, colors));
        }

        lines.push(Line::from("")); // Empty line between messages
    }

    if app.is_typing() {
        lines.push(Line::from(Span::styled(
            format!("{} is typing...", BRAND),
            Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    if let Some(ref notice) = app.notice {
        lines.push(Line::from(Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Yellow),
        )));
    }

    let messages_block = Block::default().borders(Borders::ALL).title("Conversation");

    // Keep the bottom of the conversation in view unless scrolled back
    let visible_height = area.height.saturating_sub(2) as usize;
    let total_lines = lines.len();
    let scroll = if total_lines > visible_height {
        (total_lines - visible_height).saturating_sub(app.messages_scroll as usize)
    } else {
        0
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(messages_block)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));

    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, app: &ChatApp, colors: &Palette, area: Rect) {
    let input_block = Block::default().borders(Borders::ALL).title("Message");

    let (display_text, style) = if app.input.is_empty() {
        ("How are you feeling?", Style::default().fg(colors.muted))
    } else {
        (app.input.as_str(), Style::default().fg(colors.text))
    };

    let input_paragraph = Paragraph::new(display_text).style(style).block(input_block);

    frame.render_widget(input_paragraph, area);

    if app.mode == AppMode::Chat {
        let cursor_x = area.x + 1 + app.cursor_column();
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn render_status_bar(frame: &mut Frame, app: &ChatApp, colors: &Palette, area: Rect) {
    let keys = match app.mode {
        AppMode::Chat => "Enter: Send  /attach <path>  F4: Theme  Ctrl+↑/↓: Scroll  Esc: Quit",
        AppMode::Waiting => "Waiting for reply...  Esc: Stop waiting",
    };

    let status = if app.attachments.is_empty() {
        keys.to_string()
    } else {
        format!("{}  [{} attached]", keys, app.attachments.len())
    };

    let status_bar = Paragraph::new(status).style(Style::default().fg(colors.muted));

    frame.render_widget(status_bar, area);
}
