//! Terminal implementations of [`Confirm`] and [`TokenPrompt`].
//!
//! Questions go to stderr so stdout stays clean for `show` and `export`
//! output.  End of input counts as "no" / dismissed.
//!
//! When stdin is a terminal the save token is read in raw mode without
//! echo, so it never lands in the scrollback.

use std::io::{BufRead, BufReader, IsTerminal, Stderr, Stdin, Write};
use std::sync::Mutex;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::warn;

use crate::application::prompt::{Confirm, TokenPrompt};

const TOKEN_QUESTION: &str = "Save token (leave empty to cancel):";

/// Reads one line without echo.  `Ok(None)` means the entry was aborted.
type HiddenReader = Box<dyn Fn() -> std::io::Result<Option<String>> + Send + Sync>;

/// Line-oriented console prompts over any reader and writer.
pub struct Console<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
    assume_yes: bool,
    hidden: Option<HiddenReader>,
}

impl Console<BufReader<Stdin>, Stderr> {
    /// Console on stdin/stderr.  With `assume_yes` every confirmation is
    /// accepted without asking.
    pub fn stdio(assume_yes: bool) -> Self {
        let console = Self::new(BufReader::new(std::io::stdin()), std::io::stderr(), assume_yes);
        if std::io::stdin().is_terminal() {
            console.with_hidden_input(read_hidden_line)
        } else {
            console
        }
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
            assume_yes,
            hidden: None,
        }
    }

    /// Reads the save token through `reader` instead of the echoing input.
    pub fn with_hidden_input<F>(mut self, reader: F) -> Self
    where
        F: Fn() -> std::io::Result<Option<String>> + Send + Sync + 'static,
    {
        self.hidden = Some(Box::new(reader));
        self
    }

    fn write_prompt(&self, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            let _ = write!(out, "{text}");
            let _ = out.flush();
        }
    }

    fn ask(&self, question: &str) -> Option<String> {
        self.write_prompt(&format!("{question} "));
        let mut line = String::new();
        let read = self.input.lock().ok()?.read_line(&mut line).ok()?;
        (read > 0).then(|| line.trim().to_string())
    }

    fn ask_hidden(&self, question: &str, reader: &HiddenReader) -> Option<String> {
        self.write_prompt(&format!("{question} "));
        let answer = reader();
        // Raw mode swallows the Enter key.
        self.write_prompt("\n");
        match answer {
            Ok(line) => line.map(|l| l.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "could not read token from terminal");
                None
            }
        }
    }
}

/// Restores cooked mode when dropped, including on early return.
struct RawMode;

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Collects key presses until Enter.  Esc, Ctrl-C and Ctrl-D abort.
fn read_hidden_line() -> std::io::Result<Option<String>> {
    let _raw = RawMode::enable()?;
    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(line)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None)
            }
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char(c) => line.push(c),
            _ => {}
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> Confirm for Console<R, W> {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let answer = self
            .ask(&format!("{message} [y/N]"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        matches!(answer.as_str(), "y" | "yes")
    }
}

impl<R: BufRead + Send, W: Write + Send> TokenPrompt for Console<R, W> {
    fn prompt_token(&self) -> Option<String> {
        let answer = match &self.hidden {
            Some(reader) => self.ask_hidden(TOKEN_QUESTION, reader),
            None => self.ask(TOKEN_QUESTION),
        };
        answer.filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &str, assume_yes: bool) -> Console<&[u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new(), assume_yes)
    }

    #[test]
    fn test_confirm_accepts_yes_variants() {
        assert!(console("y\n", false).confirm("Delete?"));
        assert!(console("YES\n", false).confirm("Delete?"));
    }

    #[test]
    fn test_confirm_rejects_other_answers_and_eof() {
        assert!(!console("n\n", false).confirm("Delete?"));
        assert!(!console("\n", false).confirm("Delete?"));
        assert!(!console("", false).confirm("Delete?"));
    }

    #[test]
    fn test_assume_yes_does_not_read_input() {
        let console = console("n\n", true);

        assert!(console.confirm("Delete?"));
        assert!(console.output.lock().unwrap().is_empty());
    }

    #[test]
    fn test_confirm_writes_question_to_output() {
        let console = console("y\n", false);

        console.confirm("Delete group \"Media\"?");

        let written = String::from_utf8(console.output.lock().unwrap().clone()).unwrap();
        assert!(written.contains("Delete group \"Media\"? [y/N]"));
    }

    #[test]
    fn test_prompt_token_trims_and_cancels_on_empty() {
        assert_eq!(
            console("  s3cret \n", false).prompt_token().as_deref(),
            Some("s3cret")
        );
        assert_eq!(console("\n", false).prompt_token(), None);
        assert_eq!(console("", false).prompt_token(), None);
    }

    #[test]
    fn test_prompt_token_prefers_hidden_reader_over_echoed_input() {
        // Arrange
        let console =
            console("typed\n", false).with_hidden_input(|| Ok(Some("  s3cret ".to_string())));

        // Act
        let token = console.prompt_token();

        // Assert: token came from the hidden reader, echoing input untouched
        assert_eq!(token.as_deref(), Some("s3cret"));
        let mut rest = String::new();
        console.input.lock().unwrap().read_line(&mut rest).unwrap();
        assert_eq!(rest, "typed\n");
        let written = String::from_utf8(console.output.lock().unwrap().clone()).unwrap();
        assert!(written.starts_with(TOKEN_QUESTION));
        assert!(!written.contains("s3cret"));
    }

    #[test]
    fn test_prompt_token_hidden_abort_or_failure_cancels() {
        let aborted = console("", false).with_hidden_input(|| Ok(None));
        let failed = console("", false).with_hidden_input(|| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "not a tty"))
        });
        let blank = console("", false).with_hidden_input(|| Ok(Some("   ".to_string())));

        assert_eq!(aborted.prompt_token(), None);
        assert_eq!(failed.prompt_token(), None);
        assert_eq!(blank.prompt_token(), None);
    }

    #[test]
    fn test_confirm_ignores_hidden_reader() {
        let console = console("y\n", false).with_hidden_input(|| Ok(None));

        assert!(console.confirm("Delete?"));
    }
}
