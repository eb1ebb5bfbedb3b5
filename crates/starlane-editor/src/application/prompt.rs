//! Interactive collaborators: confirmation dialogs and the save-token prompt.
//!
//! The editor never talks to a terminal or a browser dialog directly.  It asks
//! a [`Confirm`] before destructive actions and a [`TokenPrompt`] when no
//! cached save token is available.  The console implementations live in
//! `infrastructure::console`; the scripted ones below are used by tests and by
//! non-interactive CLI runs (`--yes`).

use std::collections::VecDeque;
use std::sync::Mutex;

/// Asks the user to confirm a destructive action.
pub trait Confirm: Send + Sync {
    /// Returns `true` when the user accepts `message`.
    fn confirm(&self, message: &str) -> bool;
}

/// Asks the user for a save token.
pub trait TokenPrompt: Send + Sync {
    /// Returns `None` when the user dismisses the prompt.
    fn prompt_token(&self) -> Option<String>;
}

/// A [`Confirm`] that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticConfirm(pub bool);

impl Confirm for StaticConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// A [`TokenPrompt`] that replays queued answers and records how often it was
/// asked.  Once the queue is empty every further prompt is dismissed.
#[derive(Debug, Default)]
pub struct ScriptedTokenPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<usize>,
}

impl ScriptedTokenPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| a.map(Into::into)).collect()),
            asked: Mutex::new(0),
        }
    }

    /// Number of times [`TokenPrompt::prompt_token`] has been called.
    pub fn times_asked(&self) -> usize {
        self.asked.lock().map(|n| *n).unwrap_or(0)
    }
}

impl TokenPrompt for ScriptedTokenPrompt {
    fn prompt_token(&self) -> Option<String> {
        if let Ok(mut asked) = self.asked.lock() {
            *asked += 1;
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .flatten()
    }
}
