//! Line sources.

use std::io::{self, BufRead, StdinLock};
use std::sync::Arc;

use tracing::trace;

use crate::terminal::{RealTerminal, TerminalIO};
use crate::InputError;

/// One read from a [`LineSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A line of input, without its line terminator.
    Line(String),
    /// The source is exhausted.
    EndOfInput,
}

impl ReadLine {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, ReadLine::EndOfInput)
    }

    /// Returns the line, or `None` at end of input.
    pub fn into_line(self) -> Option<String> {
        match self {
            ReadLine::Line(line) => Some(line),
            ReadLine::EndOfInput => None,
        }
    }
}

/// Where an interpreter gets its lines from.
pub trait LineSource {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether [`read_line`](Self::read_line) shows the prompt itself. When
    /// `false`, the interpreter writes the prompt to its own output first.
    fn shows_prompt(&self) -> bool {
        false
    }

    /// Reads the next line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, InputError>;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn shows_prompt(&self) -> bool {
        (**self).shows_prompt()
    }

    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, InputError> {
        (**self).read_line(prompt)
    }
}

fn strip_terminator(mut line: String) -> String {
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    line
}

/// Reads lines from any buffered reader.
///
/// The prompt is ignored; the interpreter writes it to its output stream.
///
/// ```
/// use std::io::Cursor;
/// use rcmd_input::{LineSource, ReadLine, StreamSource};
///
/// let mut source = StreamSource::new(Cursor::new("help\r\nquit"));
/// assert_eq!(source.read_line("").unwrap(), ReadLine::Line("help".into()));
/// assert_eq!(source.read_line("").unwrap(), ReadLine::Line("quit".into()));
/// assert!(source.read_line("").unwrap().is_end_of_input());
/// ```
#[derive(Debug)]
pub struct StreamSource<R: BufRead> {
    reader: R,
}

impl StreamSource<StdinLock<'static>> {
    /// Reads from locked stdin.
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> LineSource for StreamSource<R> {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn read_line(&mut self, _prompt: &str) -> Result<ReadLine, InputError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(InputError::ReadFailed)?;
        if n == 0 {
            trace!("stream exhausted");
            return Ok(ReadLine::EndOfInput);
        }
        Ok(ReadLine::Line(strip_terminator(line)))
    }
}

/// Interactive input: shows the prompt, then reads a line.
///
/// The prompt is only shown when stdin is a terminal, so piped scripts do not
/// echo prompts into the output.
#[derive(Clone)]
pub struct PromptSource<T: TerminalIO = RealTerminal> {
    terminal: Arc<T>,
}

impl PromptSource<RealTerminal> {
    pub fn new() -> Self {
        Self {
            terminal: Arc::new(RealTerminal),
        }
    }
}

impl Default for PromptSource<RealTerminal> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TerminalIO> PromptSource<T> {
    /// Create a prompt source with a custom terminal for testing.
    pub fn with_terminal(terminal: T) -> Self {
        Self {
            terminal: Arc::new(terminal),
        }
    }

    /// Whether the underlying stdin is interactive.
    pub fn is_interactive(&self) -> bool {
        self.terminal.is_terminal()
    }
}

impl<T: TerminalIO> LineSource for PromptSource<T> {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn shows_prompt(&self) -> bool {
        true
    }

    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, InputError> {
        if self.terminal.is_terminal() {
            self.terminal
                .write_prompt(prompt)
                .map_err(InputError::PromptFailed)?;
        }

        let line = self.terminal.read_line().map_err(InputError::ReadFailed)?;

        // Check for EOF (user pressed Ctrl+D)
        if line.is_empty() {
            trace!(interactive = self.terminal.is_terminal(), "end of input");
            return Ok(ReadLine::EndOfInput);
        }
        Ok(ReadLine::Line(strip_terminator(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockTerminal;
    use std::io::Cursor;

    #[test]
    fn stream_strips_terminators_only() {
        let mut source = StreamSource::new(Cursor::new("  add 1  \r\n\nlast"));
        assert_eq!(source.read_line("").unwrap(), ReadLine::Line("  add 1  ".into()));
        assert_eq!(source.read_line("").unwrap(), ReadLine::Line(String::new()));
        assert_eq!(source.read_line("").unwrap(), ReadLine::Line("last".into()));
        assert_eq!(source.read_line("").unwrap(), ReadLine::EndOfInput);
    }

    #[test]
    fn stream_does_not_show_prompt() {
        let source = StreamSource::new(Cursor::new(""));
        assert!(!source.shows_prompt());
        assert_eq!(source.name(), "stream");
    }

    #[test]
    fn stream_blank_line_is_not_end_of_input() {
        let mut source = StreamSource::new(Cursor::new("\n"));
        assert_eq!(source.read_line("").unwrap(), ReadLine::Line(String::new()));
        assert!(source.read_line("").unwrap().is_end_of_input());
    }

    #[test]
    fn stream_invalid_utf8_is_read_error() {
        let mut source = StreamSource::new(Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert!(matches!(
            source.read_line(""),
            Err(InputError::ReadFailed(_))
        ));
    }

    #[test]
    fn prompt_shows_prompt_on_terminal() {
        let terminal = MockTerminal::with_responses(["quit"]);
        let mut source = PromptSource::with_terminal(terminal.clone());
        assert!(source.shows_prompt());
        assert!(source.is_interactive());
        assert_eq!(source.read_line("(Cmd) ").unwrap(), ReadLine::Line("quit".into()));
        assert_eq!(terminal.prompts(), vec!["(Cmd) "]);
    }

    #[test]
    fn prompt_skips_prompt_when_piped() {
        let terminal = MockTerminal::piped(["quit"]);
        let mut source = PromptSource::with_terminal(terminal.clone());
        assert_eq!(source.read_line("(Cmd) ").unwrap(), ReadLine::Line("quit".into()));
        assert!(terminal.prompts().is_empty());
    }

    #[test]
    fn prompt_eof() {
        let mut source = PromptSource::with_terminal(MockTerminal::eof());
        assert_eq!(source.read_line("> ").unwrap(), ReadLine::EndOfInput);
    }

    #[test]
    fn prompt_read_failure() {
        let mut source = PromptSource::with_terminal(MockTerminal::failing());
        let err = source.read_line("> ").unwrap_err();
        assert!(matches!(err, InputError::ReadFailed(_)));
        assert_eq!(err.io_error().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn boxed_source_delegates() {
        let mut source: Box<dyn LineSource> =
            Box::new(PromptSource::with_terminal(MockTerminal::with_responses(["x"])));
        assert!(source.shows_prompt());
        assert_eq!(source.name(), "prompt");
        assert_eq!(source.read_line("").unwrap().into_line(), Some("x".into()));
    }

    #[test]
    fn read_line_accessors() {
        assert!(ReadLine::EndOfInput.is_end_of_input());
        assert_eq!(ReadLine::EndOfInput.into_line(), None);
        assert!(!ReadLine::Line(String::new()).is_end_of_input());
    }
}
