//! `rcalc`: a small calculator shell built on rcmd.
//!
//! ```text
//! $ rcalc
//! Simple calculator. Type help for commands, quit to leave.
//! calc> add 1 2
//! 3
//! calc> ans * 2
//! 6
//! calc> quit
//! ```
//!
//! Set `RUST_LOG=debug` to trace dispatch.

mod calc;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rcmd::{Cmd, Config, Selection, StreamSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

const INTRO: &str = "Simple calculator. Type help for commands, quit to leave.";

#[derive(Debug, Parser)]
#[command(name = "rcalc", version, about = "A small calculator shell")]
struct Args {
    /// YAML file with interpreter settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prompt to show before each line.
    #[arg(short, long)]
    prompt: Option<String>,

    /// Run the commands in FILE instead of reading stdin.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Run only the most recently registered matching command.
    #[arg(long)]
    single: bool,

    /// Match commands case-insensitively.
    #[arg(short = 'i', long)]
    ignore_case: bool,
}

/// Stdout as a cloneable writer, so each command can hold its own handle.
#[derive(Debug, Clone, Copy)]
struct Stdout;

impl Write for Stdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config {
            prompt: "calc> ".to_string(),
            intro: Some(INTRO.to_string()),
            ..Config::default()
        },
    };
    if let Some(prompt) = args.prompt {
        config.prompt = prompt;
    }
    if args.single {
        config.selection = Selection::Single;
    }
    if args.ignore_case {
        config.case_insensitive = true;
    }

    let mut builder = Cmd::builder();
    if let Some(path) = &args.script {
        let file = File::open(path)
            .with_context(|| format!("failed to open script '{}'", path.display()))?;
        config.prompt.clear();
        config.intro = None;
        builder = builder.input(StreamSource::new(BufReader::new(file)));
    }
    let mut cmd = builder.config(config).build();

    calc::install(&mut cmd, Stdout)?;
    cmd.hooks_mut().on_startup(|| {
        info!("calculator started");
        Ok(())
    });
    cmd.hooks_mut().on_shutdown(|| {
        info!("calculator stopped");
        Ok(())
    });

    cmd.run(None)?;
    Ok(())
}
