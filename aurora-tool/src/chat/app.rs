use std::path::PathBuf;
use std::sync::Arc;

use aurora_core::{FormattedMessage, IgnoreReason, SubmitOutcome};
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::session::{Controller, Formatter, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Chat,
    /// Waiting for the reply to the last submit.
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// What the input line asks for when Enter is pressed.
#[derive(Debug, PartialEq, Eq)]
pub enum InputCommand {
    Attach(PathBuf),
    ClearAttachments,
    Message(String),
}

pub fn parse_input(input: &str) -> InputCommand {
    let trimmed = input.trim();

    if let Some(rest) = trimmed.strip_prefix("/attach ") {
        let path = rest.trim();
        if !path.is_empty() {
            return InputCommand::Attach(PathBuf::from(path));
        }
    }

    if trimmed == "/clear-attachments" {
        return InputCommand::ClearAttachments;
    }

    InputCommand::Message(input.to_string())
}

pub struct ChatApp {
    pub mode: AppMode,
    pub should_quit: bool,
    pub input: String,
    pub cursor_pos: usize,
    pub messages_scroll: u16,
    pub theme: Theme,
    pub model: String,
    pub attachments: Vec<PathBuf>,
    pub notice: Option<String>,
    pub rendered: Vec<FormattedMessage>,

    controller: Arc<Controller>,
    formatter: Arc<Formatter>,
    revisions: watch::Receiver<usize>,
    reply_rx: Option<oneshot::Receiver<SubmitOutcome>>,
    render_rx: Option<oneshot::Receiver<Vec<FormattedMessage>>>,
}

impl ChatApp {
    pub fn new(session: Session) -> Self {
        let revisions = session.controller.subscribe();
        let model = session.controller.completion().model().to_string();

        Self {
            mode: AppMode::Chat,
            should_quit: false,
            input: String::new(),
            cursor_pos: 0,
            messages_scroll: 0,
            theme: Theme::Dark,
            model,
            attachments: Vec::new(),
            notice: None,
            rendered: Vec::new(),
            controller: session.controller,
            formatter: session.formatter,
            revisions,
            reply_rx: None,
            render_rx: None,
        }
    }

    /// True while the controller waits for the gateway.
    pub fn is_typing(&self) -> bool {
        self.controller.is_typing()
    }

    pub fn send_message(&mut self) {
        match parse_input(&self.input) {
            InputCommand::Attach(path) => {
                if path.exists() {
                    self.notice = None;
                    self.attachments.push(path);
                } else {
                    self.notice = Some(format!("No such file: {}", path.display()));
                }
                self.clear_input();
            }
            InputCommand::ClearAttachments => {
                self.attachments.clear();
                self.notice = None;
                self.clear_input();
            }
            InputCommand::Message(text) => {
                if text.trim().is_empty() && self.attachments.is_empty() {
                    return;
                }
                if self.mode == AppMode::Waiting || self.is_typing() {
                    self.notice = Some("Still waiting for the previous reply".to_string());
                    return;
                }

                let attachments = std::mem::take(&mut self.attachments);
                self.clear_input();

                let (tx, rx) = oneshot::channel();
                let controller = Arc::clone(&self.controller);

                // The submit runs to completion even if the UI stops waiting.
                tokio::spawn(async move {
                    let outcome = controller.submit(&text, &attachments).await;
                    let _ = tx.send(outcome);
                });

                self.reply_rx = Some(rx);
                self.mode = AppMode::Waiting;
                self.notice = None;
            }
        }
    }

    /// Stops waiting for the reply; it is still appended when it arrives.
    pub fn stop_waiting(&mut self) {
        self.reply_rx = None;
        self.mode = AppMode::Chat;
        self.notice = Some("Stopped waiting; the reply will appear when it arrives".to_string());
    }

    /// Collects finished background work. Called once per UI tick.
    pub fn poll(&mut self) {
        self.poll_reply();
        self.poll_history();
        self.poll_render();
    }

    fn poll_reply(&mut self) {
        if let Some(ref mut rx) = self.reply_rx {
            match rx.try_recv() {
                Ok(outcome) => {
                    if outcome == SubmitOutcome::Ignored(IgnoreReason::Busy) {
                        self.notice = Some("Still waiting for the previous reply".to_string());
                    }
                    self.reply_rx = None;
                    self.mode = AppMode::Chat;
                    self.messages_scroll = 0; // Scroll to bottom
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    // Still waiting
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.notice = Some("Request was dropped".to_string());
                    self.reply_rx = None;
                    self.mode = AppMode::Chat;
                }
            }
        }
    }

    fn poll_history(&mut self) {
        if self.revisions.has_changed().unwrap_or(false) {
            let len = *self.revisions.borrow_and_update();
            debug!(messages = len, "history changed, re-rendering");
            self.spawn_render();
        }
    }

    /// Re-derives every rendered message from the current history.
    ///
    /// A newer render replaces the receiver of an older one, whose result is
    /// then discarded.
    fn spawn_render(&mut self) {
        let (tx, rx) = oneshot::channel();
        let history = self.controller.history();
        let formatter = Arc::clone(&self.formatter);

        tokio::spawn(async move {
            let formatted = formatter.format_history(&history).await;
            let _ = tx.send(formatted);
        });

        self.render_rx = Some(rx);
    }

    fn poll_render(&mut self) {
        if let Some(ref mut rx) = self.render_rx {
            match rx.try_recv() {
                Ok(formatted) => {
                    self.rendered = formatted;
                    self.render_rx = None;
                    self.messages_scroll = 0;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.render_rx = None;
                }
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn scroll_up(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.messages_scroll = self.messages_scroll.saturating_sub(1);
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    pub fn input_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn input_backspace(&mut self) {
        if self.cursor_pos > 0 {
            let prev_char_boundary = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.remove(prev_char_boundary);
            self.cursor_pos = prev_char_boundary;
        }
    }

    pub fn input_delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn input_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn input_right(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.cursor_pos = self.input[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input.len());
        }
    }

    pub fn input_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn input_end(&mut self) {
        self.cursor_pos = self.input.len();
    }

    /// Cursor column in characters, for terminal placement.
    pub fn cursor_column(&self) -> u16 {
        self.input[..self.cursor_pos].chars().count() as u16
    }
}
