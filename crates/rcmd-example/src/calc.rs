//! Calculator commands.

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use rcmd::{Cmd, CommandContext, CommandHandler, PatternError, RegisterOptions};

const EXPRESSION: &str =
    r"(?P<lhs>ans|[-+]?[\d.]+)\s*(?P<op>[-+*/])\s*(?P<rhs>ans|[-+]?[\d.]+)";
const HELP: &str = r"(?:help|\?)";

/// Usage lines for `help`, keyed by rule.
const USAGE: &[(&str, &str, &str)] = &[
    (r"add\b", "add N...", "sum the numbers"),
    (r"sub\b", "sub N...", "subtract the rest from the first number"),
    (r"mul\b", "mul N...", "multiply the numbers"),
    (r"div\b", "div N...", "divide the first number by the rest"),
    (EXPRESSION, "A op B", "evaluate a single +, -, * or / expression"),
    ("ans", "ans", "show the last result"),
    (HELP, "help", "show this list"),
    ("(?:quit|exit)", "quit", "leave the calculator"),
];

fn usage(rule: &str) -> Option<(&'static str, &'static str)> {
    USAGE
        .iter()
        .find(|(r, _, _)| *r == rule)
        .map(|(_, usage, about)| (*usage, *about))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Op::Add),
            "-" => Some(Op::Sub),
            "*" => Some(Op::Mul),
            "/" => Some(Op::Div),
            _ => None,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, String> {
        match self {
            Op::Add => Ok(lhs + rhs),
            Op::Sub => Ok(lhs - rhs),
            Op::Mul => Ok(lhs * rhs),
            Op::Div if rhs == 0.0 => Err("division by zero".to_string()),
            Op::Div => Ok(lhs / rhs),
        }
    }

    fn fold(self, operands: &[f64]) -> Result<f64, String> {
        let Some((first, rest)) = operands.split_first() else {
            return Err("expected at least one number".to_string());
        };
        rest.iter().try_fold(*first, |acc, &n| self.apply(acc, n))
    }
}

/// Parses one operand. `ans` stands for the last result.
fn operand(token: &str, memory: f64) -> Result<f64, String> {
    if token == "ans" {
        return Ok(memory);
    }
    token
        .parse()
        .map_err(|_| format!("not a number: {}", token))
}

/// Evaluates an inline `lhs op rhs` expression from its captures.
fn evaluate(ctx: &CommandContext, memory: f64) -> Result<f64, String> {
    let lhs = operand(ctx.capture("lhs").unwrap_or_default(), memory)?;
    let rhs = operand(ctx.capture("rhs").unwrap_or_default(), memory)?;
    let op = ctx
        .capture("op")
        .and_then(Op::from_symbol)
        .ok_or_else(|| "unknown operator".to_string())?;
    op.apply(lhs, rhs)
}

/// Registers the calculator on `cmd`, printing results to `out`.
///
/// Bad input is reported on `out` and never stops the loop.
pub fn install<W>(cmd: &mut Cmd, out: W) -> Result<(), PatternError>
where
    W: Write + Clone + 'static,
{
    let memory = Rc::new(Cell::new(0.0_f64));

    for (rule, op) in [
        (r"add\b", Op::Add),
        (r"sub\b", Op::Sub),
        (r"mul\b", Op::Mul),
        (r"div\b", Op::Div),
    ] {
        let mut out = out.clone();
        let memory = memory.clone();
        cmd.register_command(
            rule,
            CommandHandler::new(move |args: &[String]| -> anyhow::Result<bool> {
                let result = args
                    .iter()
                    .map(|arg| operand(arg, memory.get()))
                    .collect::<Result<Vec<_>, _>>()
                    .and_then(|operands| op.fold(&operands));
                match result {
                    Ok(value) => {
                        memory.set(value);
                        writeln!(out, "{}", value)?;
                    }
                    Err(message) => writeln!(out, "*** {}", message)?,
                }
                Ok(false)
            }),
            RegisterOptions::new(),
        )?;
    }

    let mut expr_out = out.clone();
    let expr_memory = memory.clone();
    cmd.register_command(
        EXPRESSION,
        CommandHandler::injected(move |_args: &[String], ctx: &CommandContext| {
            match evaluate(ctx, expr_memory.get()) {
                Ok(value) => {
                    expr_memory.set(value);
                    writeln!(expr_out, "{}", value)?;
                }
                Err(message) => writeln!(expr_out, "*** {}", message)?,
            }
            anyhow::Ok(false)
        }),
        RegisterOptions::new().strict(),
    )?;

    let mut ans_out = out.clone();
    let ans_memory = memory;
    cmd.register_command(
        "ans",
        CommandHandler::no_args(move || {
            writeln!(ans_out, "{}", ans_memory.get())?;
            anyhow::Ok(false)
        }),
        RegisterOptions::new().strict(),
    )?;

    cmd.register_command(
        "(?:quit|exit)",
        CommandHandler::no_args(|| true),
        RegisterOptions::new().strict(),
    )?;

    // Help lists whatever is registered when it runs.
    let registry = cmd.registry_handle();
    let mut help_out = out;
    cmd.register_command(
        HELP,
        CommandHandler::no_args(move || {
            for rule in registry.rules() {
                if let Some((synopsis, about)) = usage(&rule) {
                    writeln!(help_out, "  {:<10} {}", synopsis, about)?;
                }
            }
            anyhow::Ok(false)
        }),
        RegisterOptions::new().strict(),
    )?;

    // Lines starting with '#' are comments.
    cmd.hooks_mut().add_before_command(|line| {
        Ok(if line.starts_with('#') {
            String::new()
        } else {
            line
        })
    });

    Ok(())
}
