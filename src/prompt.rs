//! Interactive confirmation and progress messages.
//!
//! Operations never read stdin or print progress directly; they go through
//! [`Prompt`] so tests can script the answers.

use std::io::{self, BufRead, Write};

/// User interaction during an operation.
pub trait Prompt {
    /// Ask a yes/no question. An empty answer picks the default.
    fn confirm(&self, question: &str, default_yes: bool) -> bool;

    /// Progress line shown while the operation runs.
    fn note(&self, message: &str);

    /// Non-fatal problem the user should know about.
    fn warn(&self, message: &str);
}

/// Interpret a typed answer.
///
/// Empty input picks the default; otherwise only `y`/`yes` mean yes.
pub fn parse_answer(input: &str, default_yes: bool) -> bool {
    let answer = input.trim().to_lowercase();
    if answer.is_empty() {
        default_yes
    } else {
        answer == "y" || answer == "yes"
    }
}

/// Suffix shown after a question, e.g. `[Y/n]`.
pub fn answer_hint(default_yes: bool) -> &'static str {
    if default_yes { "[Y/n]" } else { "[y/N]" }
}

/// Prompt on the controlling terminal.
///
/// With JSON output, notes and questions go to stderr so stdout stays
/// machine-readable.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    json: bool,
}

impl TerminalPrompt {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn out(&self) -> Box<dyn Write> {
        if self.json {
            Box::new(io::stderr())
        } else {
            Box::new(io::stdout())
        }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str, default_yes: bool) -> bool {
        let mut out = self.out();
        let _ = write!(out, "{} {}: ", question, answer_hint(default_yes));
        let _ = out.flush();

        let mut input = String::new();
        // unreadable stdin counts as an empty answer
        if io::stdin().lock().read_line(&mut input).is_err() {
            input.clear();
        }
        parse_answer(&input, default_yes)
    }

    fn note(&self, message: &str) {
        let mut out = self.out();
        let _ = writeln!(out, "{}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }
}
