//! Integration tests for rcmd-input.
//!
//! These tests drive sources the way an interpreter loop does: one
//! `read_line` per iteration until end of input.

use std::fs::File;
use std::io::{BufReader, Write};

use rcmd_input::{InputError, LineSource, MockTerminal, PromptSource, ReadLine, StreamSource};

fn drain(source: &mut dyn LineSource, prompt: &str) -> Vec<String> {
    let mut lines = Vec::new();
    while let ReadLine::Line(line) = source.read_line(prompt).unwrap() {
        lines.push(line);
    }
    lines
}

#[test]
fn script_file_is_read_line_by_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "add 1 2").unwrap();
    writeln!(file).unwrap();
    write!(file, "quit").unwrap();
    file.flush().unwrap();

    let reader = BufReader::new(File::open(file.path()).unwrap());
    let mut source = StreamSource::new(reader);

    assert_eq!(drain(&mut source, "(Cmd) "), vec!["add 1 2", "", "quit"]);
    // Exhausted sources keep reporting end of input.
    assert!(source.read_line("").unwrap().is_end_of_input());
}

#[test]
fn end_of_input_is_distinct_from_any_line() {
    // Text that looks like a sentinel is still an ordinary line.
    let terminal = MockTerminal::with_responses(["\u{0}\u{0}", "EOF"]);
    let mut source = PromptSource::with_terminal(terminal);

    assert_eq!(drain(&mut source, "> "), vec!["\u{0}\u{0}", "EOF"]);
}

#[test]
fn interactive_session_shows_prompt_per_read() {
    let terminal = MockTerminal::with_responses(["one", "two"]);
    let mut source = PromptSource::with_terminal(terminal.clone());

    drain(&mut source, "calc> ");
    assert_eq!(terminal.prompts(), vec!["calc> ", "calc> ", "calc> "]);
    assert_eq!(terminal.remaining(), 0);
}

#[test]
fn read_failure_surfaces_as_error() {
    let mut source = PromptSource::with_terminal(MockTerminal::failing());
    let err = source.read_line("> ").unwrap_err();
    assert!(matches!(err, InputError::ReadFailed(_)));
    assert!(err.to_string().starts_with("Failed to read line"));
}
