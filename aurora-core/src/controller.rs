use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::completion::{ChatCompletion, Reply};
use crate::message::{ConversationHistory, Message};

/// Assistant text used when the gateway answered without a reply.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't understand that.";

/// Assistant text used when the completion call failed.
pub const FAILURE_REPLY: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// A completion request is in flight; the typing indicator is on.
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No text after trimming and no attachments.
    EmptyInput,
    /// Another submit is still waiting for its reply.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The user turn and this assistant turn were appended.
    Replied(Message),
    /// Nothing was appended.
    Ignored(IgnoreReason),
}

/// An accepted submit between its user turn and its assistant turn.
///
/// Holds the in-flight slot. If dropped before [`finish`](Self::finish), it
/// closes the turn with the reply received so far, or [`FAILURE_REPLY`],
/// and then releases the slot.
struct OpenTurn<'a, C> {
    controller: &'a ConversationController<C>,
    reply: Option<String>,
    closed: bool,
}

impl<C> OpenTurn<'_, C> {
    fn finish(mut self, reply: String) -> Message {
        self.closed = true;
        let message = Message::assistant(reply);
        let len = self.controller.append(message.clone());
        info!(messages = len, "assistant turn appended");
        message
    }
}

impl<C> Drop for OpenTurn<'_, C> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("submit dropped before its reply was appended");
            let reply = self.reply.take().unwrap_or_else(|| FAILURE_REPLY.to_string());
            self.controller.append(Message::assistant(reply));
        }
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

/// Owns the conversation and talks to the completion gateway.
///
/// At most one [`submit`](Self::submit) is in flight at a time. An accepted
/// submit always appends exactly one user and one assistant message, even
/// when its future is dropped before the gateway answers.
pub struct ConversationController<C> {
    completion: C,
    history: Mutex<ConversationHistory>,
    in_flight: AtomicBool,
    typing_delay: Duration,
    revision: watch::Sender<usize>,
}

impl<C> ConversationController<C> {
    fn lock_history(&self) -> MutexGuard<'_, ConversationHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one message and returns the new history length.
    fn append(&self, message: Message) -> usize {
        let mut history = self.lock_history();
        history.push(message);
        let len = history.len();
        self.revision.send_replace(len);
        len
    }
}

impl<C: ChatCompletion> ConversationController<C> {
    pub fn new(completion: C, history: ConversationHistory) -> Self {
        let (revision, _) = watch::channel(history.len());
        Self {
            completion,
            history: Mutex::new(history),
            in_flight: AtomicBool::new(false),
            typing_delay: Duration::ZERO,
            revision,
        }
    }

    /// Pause between receiving a reply and appending it.
    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn completion(&self) -> &C {
        &self.completion
    }

    pub fn state(&self) -> ControllerState {
        if self.in_flight.load(Ordering::Acquire) {
            ControllerState::AwaitingReply
        } else {
            ControllerState::Idle
        }
    }

    pub fn is_typing(&self) -> bool {
        self.state() == ControllerState::AwaitingReply
    }

    /// Snapshot of the history, system instruction first.
    pub fn history(&self) -> Vec<Message> {
        self.lock_history().messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock_history().len()
    }

    /// Receives the history length after every append.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.revision.subscribe()
    }

    /// Sends `text` as a user turn and appends the assistant's answer.
    ///
    /// Attachments only make an otherwise empty submit acceptable; their
    /// contents are not forwarded to the gateway.
    pub async fn submit(&self, text: &str, attachments: &[PathBuf]) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() && attachments.is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submit ignored while awaiting a reply");
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        }

        if !attachments.is_empty() {
            debug!(count = attachments.len(), "attachments are not forwarded");
        }

        let transcript = {
            let mut history = self.lock_history();
            history.push(Message::user(text));
            self.revision.send_replace(history.len());
            history.messages().to_vec()
        };
        let mut turn = OpenTurn {
            controller: self,
            reply: None,
            closed: false,
        };

        let reply = match self.completion.complete(&transcript).await {
            Ok(Reply::Text(text)) => text,
            Ok(Reply::Empty) => {
                warn!("completion response carried no reply");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                error!(error = %e, "chat completion failed");
                return SubmitOutcome::Replied(turn.finish(FAILURE_REPLY.to_string()));
            }
        };

        turn.reply = Some(reply.clone());
        self.pause().await;

        SubmitOutcome::Replied(turn.finish(reply))
    }

    async fn pause(&self) {
        if !self.typing_delay.is_zero() {
            tokio::time::sleep(self.typing_delay).await;
        }
    }
}
