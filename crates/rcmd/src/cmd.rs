//! The interpreter: command registry, hooks, input and output wired into a
//! read-dispatch loop.

use std::fmt;
use std::io::{self, Write};

use rcmd_dispatch::{
    CommandHandler, Dispatcher, IntoHandlerResult, Outcome, PatternError, RegisterOptions,
    Registration, RegistryHandle, Resolution, Selection,
};
use rcmd_input::{LineSource, PromptSource, ReadLine, StreamSource};
use tracing::{debug, debug_span, warn};

use crate::config::Config;
use crate::error::CmdError;
use crate::hooks::Hooks;

/// Where [`Cmd::run`] is in its life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    NotStarted,
    Running,
    Stopped,
}

/// A line-oriented command interpreter.
///
/// Commands are regex rules bound to handlers. Each line read is matched
/// against every rule; matching handlers run in registration order and their
/// results decide whether the loop stops.
///
/// ```
/// use rcmd::{Cmd, CaptureBuffer, CommandHandler, MockTerminal, PromptSource, RegisterOptions};
///
/// let out = CaptureBuffer::new();
/// let mut cmd = Cmd::builder()
///     .input(PromptSource::with_terminal(MockTerminal::with_responses(["greet", "quit"])))
///     .output(out.clone())
///     .build();
///
/// let mut printer = out.clone();
/// cmd.register_command(
///     "greet",
///     CommandHandler::no_args(move || {
///         use std::io::Write;
///         writeln!(printer, "hello")?;
///         anyhow::Ok(false)
///     }),
///     RegisterOptions::new(),
/// )?;
/// cmd.register_command("quit", CommandHandler::no_args(|| true), RegisterOptions::new())?;
///
/// cmd.run(None)?;
/// assert_eq!(out.contents(), "hello\n");
/// # Ok::<(), rcmd::CmdError>(())
/// ```
pub struct Cmd {
    dispatcher: Dispatcher,
    hooks: Hooks,
    source: Box<dyn LineSource>,
    output: Box<dyn Write>,
    prompt: String,
    intro: Option<String>,
    last_line: String,
    state: LoopState,
}

impl Default for Cmd {
    fn default() -> Self {
        Self::new()
    }
}

impl Cmd {
    /// An interpreter on stdin/stdout with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CmdBuilder {
        CmdBuilder::new()
    }

    /// Compiles `rule` and binds `handler` to it.
    ///
    /// An invalid rule fails here and leaves the registry unchanged.
    pub fn register_command(
        &mut self,
        rule: &str,
        handler: CommandHandler,
        options: RegisterOptions,
    ) -> Result<Registration, PatternError> {
        self.dispatcher.register(rule, handler, options)
    }

    /// Registers a handler receiving the argument list, with default options.
    pub fn command<F, R>(&mut self, rule: &str, f: F) -> Result<Registration, PatternError>
    where
        F: FnMut(&[String]) -> R + 'static,
        R: IntoHandlerResult,
    {
        self.register_command(rule, CommandHandler::new(f), RegisterOptions::new())
    }

    /// Removes every handler under the pattern `rule` compiles to.
    ///
    /// `options` must match the ones used at registration, since anchoring
    /// and case sensitivity are part of the compiled pattern.
    pub fn unregister_command(
        &mut self,
        rule: &str,
        options: RegisterOptions,
    ) -> Result<bool, PatternError> {
        self.dispatcher.unregister(rule, options)
    }

    /// Removes one handler added earlier, leaving others under the same
    /// pattern in place.
    pub fn unregister_handler(&mut self, registration: &Registration) -> bool {
        self.dispatcher.handle().unregister_handler(registration)
    }

    /// A handle on the command registry that handlers can capture to add or
    /// remove commands while the loop runs. Changes apply from the next line.
    ///
    /// A handler holding a handle keeps the registry, and so itself, alive
    /// until it is unregistered.
    pub fn registry_handle(&self) -> RegistryHandle {
        self.dispatcher.handle()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// The hook table, for registering lifecycle callbacks.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn intro(&self) -> Option<&str> {
        self.intro.as_deref()
    }

    /// The last non-empty line that reached dispatch.
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Dispatches a single line, as the loop does after `before_command`.
    ///
    /// Blank lines fire `empty_line`; lines no rule matches fire `default`.
    pub fn onecmd(&mut self, line: &str) -> Result<Outcome, CmdError> {
        match self.dispatcher.resolve(line) {
            Resolution::Empty => {
                let stop = self.hooks.fire_empty_line(&mut *self.output)?;
                Ok(Outcome::stop(stop))
            }
            Resolution::NoMatch => {
                self.last_line = line.to_string();
                debug!("no rule matched");
                let stop = self.hooks.fire_default(line, &mut *self.output)?;
                Ok(Outcome::stop(stop))
            }
            Resolution::Matched(matched) => {
                self.last_line = line.to_string();
                Ok(matched.invoke()?)
            }
        }
    }

    /// Runs the loop until a command asks to stop or input runs out.
    ///
    /// `intro`, when given, replaces the configured intro. An error from a
    /// handler or hook ends the loop immediately and skips `shutdown`.
    pub fn run(&mut self, intro: Option<&str>) -> Result<(), CmdError> {
        self.state = LoopState::Running;
        let result = self.run_loop(intro);
        self.state = LoopState::Stopped;
        if let Err(err) = &result {
            warn!(error = %err, "command loop aborted");
        }
        result
    }

    fn run_loop(&mut self, intro: Option<&str>) -> Result<(), CmdError> {
        let span = debug_span!("cmdloop", source = self.source.name());
        let _enter = span.enter();

        self.hooks.fire_startup()?;

        if let Some(intro) = intro {
            self.intro = Some(intro.to_string());
        }
        if let Some(intro) = &self.intro {
            writeln!(self.output, "{}", intro)?;
            self.output.flush()?;
        }

        let mut stop: Option<bool> = None;
        while stop != Some(true) {
            let line = match self.read_line()? {
                ReadLine::Line(line) => line,
                ReadLine::EndOfInput => {
                    debug!("end of input");
                    stop = Some(true);
                    continue;
                }
            };

            let span = debug_span!("command", line = %line);
            let _enter = span.enter();

            let line = self.hooks.fire_before_command(line)?;
            let outcome = self.onecmd(&line)?;
            let outcome = self.hooks.fire_after_command(outcome, &line)?;
            debug!(stop = outcome.stop, results = outcome.results.len(), "command done");
            stop = Some(outcome.stop);
        }

        self.hooks.fire_shutdown()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<ReadLine, CmdError> {
        if !self.source.shows_prompt() {
            self.output.write_all(self.prompt.as_bytes())?;
            self.output.flush()?;
        }
        match self.source.read_line(&self.prompt) {
            Ok(read) => Ok(read),
            Err(err) => {
                warn!(error = %err, "read failed, treating as end of input");
                Ok(ReadLine::EndOfInput)
            }
        }
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd")
            .field("prompt", &self.prompt)
            .field("intro", &self.intro)
            .field("source", &self.source.name())
            .field("dispatcher", &self.dispatcher)
            .field("hooks", &self.hooks)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Cmd`].
pub struct CmdBuilder {
    config: Config,
    source: Option<Box<dyn LineSource>>,
    output: Option<Box<dyn Write>>,
    hooks: Hooks,
}

impl Default for CmdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            source: None,
            output: None,
            hooks: Hooks::new(),
        }
    }

    /// Replaces all settings at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn intro(mut self, intro: impl Into<String>) -> Self {
        self.config.intro = Some(intro.into());
        self
    }

    /// Choose between the interactive prompt source and plain stdin.
    ///
    /// Ignored when [`input`](Self::input) is set.
    pub fn use_rawinput(mut self, yes: bool) -> Self {
        self.config.use_rawinput = yes;
        self
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.config.case_insensitive = yes;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.config.selection = selection;
        self
    }

    /// Reads lines from `source` instead of stdin.
    pub fn input(mut self, source: impl LineSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Writes prompts, intro and diagnostics to `output` instead of stdout.
    pub fn output(mut self, output: impl Write + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Starts from a prepared hook table.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Cmd {
        let Config {
            prompt,
            intro,
            use_rawinput,
            case_insensitive,
            selection,
        } = self.config;

        let source: Box<dyn LineSource> = match self.source {
            Some(source) => source,
            None if use_rawinput => Box::new(PromptSource::new()),
            None => Box::new(StreamSource::stdin()),
        };
        let output: Box<dyn Write> = match self.output {
            Some(output) => output,
            None => Box::new(io::stdout()),
        };

        Cmd {
            dispatcher: Dispatcher::new()
                .with_selection(selection)
                .with_case_insensitive(case_insensitive),
            hooks: self.hooks,
            source,
            output,
            prompt,
            intro,
            last_line: String::new(),
            state: LoopState::NotStarted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcmd_input::{CaptureBuffer, MockTerminal};
    use serde_json::json;
    use std::io::Cursor;

    fn scripted(lines: &str) -> (Cmd, CaptureBuffer) {
        let out = CaptureBuffer::new();
        let cmd = Cmd::builder()
            .input(StreamSource::new(Cursor::new(lines.to_string())))
            .output(out.clone())
            .build();
        (cmd, out)
    }

    #[test]
    fn test_builder_applies_config() {
        let cmd = Cmd::builder()
            .prompt("calc> ")
            .intro("hi")
            .selection(Selection::Single)
            .input(StreamSource::new(Cursor::new("")))
            .output(Vec::new())
            .build();
        assert_eq!(cmd.prompt(), "calc> ");
        assert_eq!(cmd.intro(), Some("hi"));
        assert_eq!(cmd.dispatcher().selection(), Selection::Single);
        assert_eq!(cmd.state(), LoopState::NotStarted);
    }

    #[test]
    fn test_onecmd_blank_line_fires_empty_line() {
        let (mut cmd, _) = scripted("");
        cmd.hooks_mut().on_empty_line(|_out| Ok(true));
        assert_eq!(cmd.onecmd("   ").unwrap(), Outcome::stop(true));
        assert_eq!(cmd.last_line(), "");
    }

    #[test]
    fn test_onecmd_unmatched_fires_default() {
        let (mut cmd, out) = scripted("");
        let outcome = cmd.onecmd("nope").unwrap();
        assert_eq!(outcome, Outcome::stop(false));
        assert_eq!(out.contents(), "*** Unknown syntax: nope\n");
        assert_eq!(cmd.last_line(), "nope");
    }

    #[test]
    fn test_onecmd_matched_collects_results() {
        let (mut cmd, _) = scripted("");
        cmd.command("add", |args: &[String]| anyhow::Ok(args.len())).unwrap();
        let outcome = cmd.onecmd("add 1 2").unwrap();
        assert_eq!(outcome, Outcome::new(true, vec![json!(2)]));
        assert_eq!(cmd.last_line(), "add 1 2");
    }

    #[test]
    fn test_stream_source_gets_prompt_on_output() {
        let (mut cmd, out) = scripted("");
        cmd.run(None).unwrap();
        assert_eq!(out.contents(), "(Cmd) ");
    }

    #[test]
    fn test_prompt_source_shows_its_own_prompt() {
        let terminal = MockTerminal::eof();
        let out = CaptureBuffer::new();
        let mut cmd = Cmd::builder()
            .prompt("> ")
            .input(PromptSource::with_terminal(terminal.clone()))
            .output(out.clone())
            .build();
        cmd.run(None).unwrap();
        assert_eq!(out.contents(), "");
        assert_eq!(terminal.prompts(), vec!["> "]);
    }

    #[test]
    fn test_intro_argument_overrides_config() {
        let out = CaptureBuffer::new();
        let mut cmd = Cmd::builder()
            .intro("configured")
            .prompt("")
            .input(StreamSource::new(Cursor::new("")))
            .output(out.clone())
            .build();
        cmd.run(Some("given")).unwrap();
        assert_eq!(out.contents(), "given\n");
        assert_eq!(cmd.intro(), Some("given"));
    }

    #[test]
    fn test_state_transitions() {
        let (mut cmd, _) = scripted("");
        cmd.run(None).unwrap();
        assert_eq!(cmd.state(), LoopState::Stopped);
    }
}
