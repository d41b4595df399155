//! Terminal abstraction for interactive input.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Abstraction over terminal I/O for testability.
pub trait TerminalIO: Send + Sync {
    /// Check if stdin is a terminal.
    fn is_terminal(&self) -> bool;

    /// Write a prompt to stdout.
    fn write_prompt(&self, prompt: &str) -> io::Result<()>;

    /// Read a line from stdin, including its line terminator.
    ///
    /// Returns an empty string at end of input.
    fn read_line(&self) -> io::Result<String>;
}

/// Real terminal I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTerminal;

impl TerminalIO for RealTerminal {
    fn is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn write_prompt(&self, prompt: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()
    }

    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<String>,
    prompts: Vec<String>,
    fail_reads: bool,
}

/// Mock terminal for testing prompts.
///
/// Clones share state, so a test can keep one handle to inspect the prompts
/// shown after giving another to a source.
#[derive(Debug, Clone)]
pub struct MockTerminal {
    is_terminal: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockTerminal {
    fn build(is_terminal: bool, responses: VecDeque<String>, fail_reads: bool) -> Self {
        Self {
            is_terminal,
            state: Arc::new(Mutex::new(MockState {
                responses,
                prompts: Vec::new(),
                fail_reads,
            })),
        }
    }

    /// Create a mock terminal that returns the given responses in sequence,
    /// then end of input.
    pub fn with_responses(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::build(true, responses.into_iter().map(Into::into).collect(), false)
    }

    /// Create a mock that simulates piped (non-terminal) input.
    pub fn piped(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::build(false, responses.into_iter().map(Into::into).collect(), false)
    }

    /// Create a mock that simulates EOF (Ctrl+D) immediately.
    pub fn eof() -> Self {
        Self::build(true, VecDeque::new(), false)
    }

    /// Create a mock whose reads always fail.
    pub fn failing() -> Self {
        Self::build(true, VecDeque::new(), true)
    }

    /// Prompts written so far.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Number of responses not yet read.
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TerminalIO for MockTerminal {
    fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    fn write_prompt(&self, prompt: &str) -> io::Result<()> {
        self.lock().prompts.push(prompt.to_string());
        Ok(())
    }

    fn read_line(&self) -> io::Result<String> {
        let mut state = self.lock();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock read failure"));
        }
        // Add newline like real read_line does; empty string is EOF.
        Ok(state
            .responses
            .pop_front()
            .map(|r| format!("{}\n", r))
            .unwrap_or_default())
    }
}
