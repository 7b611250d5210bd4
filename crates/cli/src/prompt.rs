//! Line-based interactive input.
//!
//! Answers are read one line at a time so flows can be driven from a pipe.
//! Labels go to stderr and only when a human is typing.

use std::io::{self, BufRead, Write};

use crate::exit_codes::{EXIT_CANCELLED, EXIT_ERROR};
use crate::CliError;

pub struct Prompter<R, W> {
    input: R,
    output: W,
    show_labels: bool,
}

impl Prompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(
            io::stdin().lock(),
            io::stderr(),
            atty::is(atty::Stream::Stdin),
        )
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, show_labels: bool) -> Self {
        Self { input, output, show_labels }
    }

    /// Next answer, without the line ending. End of input cancels.
    pub fn ask(&mut self, label: &str) -> Result<String, CliError> {
        if self.show_labels {
            write!(self.output, "{label}: ").and_then(|_| self.output.flush()).map_err(io_error)?;
        }
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(io_error)?;
        if read == 0 {
            return Err(cancelled("input ended"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Yes/no question. Anything but an explicit yes is a no.
    pub fn confirm(&mut self, question: &str) -> Result<bool, CliError> {
        let answer = self.ask(&format!("{question} [y/N]"))?;
        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes" | "c" | "có" | "co"
        ))
    }

    /// Informational line, shown only to a human.
    pub fn note(&mut self, text: &str) {
        if self.show_labels {
            let _ = writeln!(self.output, "{text}");
        }
    }
}

/// Ask before a destructive step unless the caller already said yes.
pub fn require_confirmation<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    skip: bool,
    question: &str,
) -> Result<(), CliError> {
    if skip || prompter.confirm(question)? {
        Ok(())
    } else {
        Err(cancelled("cancelled"))
    }
}

fn cancelled(message: &str) -> CliError {
    CliError {
        code: EXIT_CANCELLED,
        message: message.to_string(),
        hint: Some("pass --yes to skip confirmation".into()),
    }
}

fn io_error(e: io::Error) -> CliError {
    CliError { code: EXIT_ERROR, message: e.to_string(), hint: None }
}
