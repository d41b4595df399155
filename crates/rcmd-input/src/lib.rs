//! Line sources for line-oriented command interpreters.
//!
//! `rcmd-input` supplies the lines an `rcmd` interpreter dispatches. A
//! [`LineSource`] yields either a [`ReadLine::Line`] or the out-of-band
//! [`ReadLine::EndOfInput`]; no user-typed text can be mistaken for the end
//! of input.
//!
//! # Sources
//!
//! - [`PromptSource`] - interactive input: shows the prompt on the terminal,
//!   then reads a line (the "raw input" mode)
//! - [`StreamSource`] - reads lines from any `BufRead`; the interpreter writes
//!   the prompt to its own output stream
//!
//! # Testing
//!
//! Sources accept mock implementations:
//!
//! ```
//! use rcmd_input::{LineSource, MockTerminal, PromptSource, ReadLine};
//!
//! let terminal = MockTerminal::with_responses(["add 1 2"]);
//! let mut source = PromptSource::with_terminal(terminal.clone());
//!
//! assert_eq!(source.read_line("> ").unwrap(), ReadLine::Line("add 1 2".into()));
//! assert_eq!(source.read_line("> ").unwrap(), ReadLine::EndOfInput);
//! assert_eq!(terminal.prompts(), vec!["> ", "> "]);
//! ```

mod capture;
mod error;
mod source;
mod terminal;

pub use capture::CaptureBuffer;
pub use error::InputError;
pub use source::{LineSource, PromptSource, ReadLine, StreamSource};
pub use terminal::{MockTerminal, RealTerminal, TerminalIO};
