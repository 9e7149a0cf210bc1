//! Line-oriented edit session.
//!
//! Mirrors the table UI the ledger engine was built for: amounts are typed
//! into a per-node input first, then submitted as a percentage or direct edit.

use std::io::{BufRead, Write};
use std::str::FromStr;

use tracing::debug;

use crate::application::services::LedgerSession;
use crate::cli::error::{CliError, CliResult};
use crate::cli::render::{render, RenderOptions};
use crate::domain::EditMode;
use crate::infrastructure::InfraError;

const HELP: &str = "\
commands:
  set ID AMOUNT   store a pending amount for ID
  pct ID          apply the pending amount of ID as a percentage change
  val ID          apply the pending amount of ID as the new value
  show            render the current ledger
  inputs          list pending amounts
  clear           drop all pending amounts
  reset           return to the baseline ledger
  help            this text
  quit            leave";

/// One parsed session line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Set { id: String, amount: f64 },
    Submit { id: String, mode: EditMode },
    Show,
    Inputs,
    Clear,
    Reset,
    Help,
    Quit,
}

impl FromStr for ReplCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["set", id, amount] => amount
                .parse::<f64>()
                .map(|amount| ReplCommand::Set {
                    id: id.to_string(),
                    amount,
                })
                .map_err(|e| format!("invalid amount '{amount}': {e}")),
            [verb @ ("pct" | "val"), id] => Ok(ReplCommand::Submit {
                id: id.to_string(),
                mode: verb.parse()?,
            }),
            ["show"] => Ok(ReplCommand::Show),
            ["inputs"] => Ok(ReplCommand::Inputs),
            ["clear"] => Ok(ReplCommand::Clear),
            ["reset"] => Ok(ReplCommand::Reset),
            ["help"] | ["?"] => Ok(ReplCommand::Help),
            ["quit"] | ["exit"] | ["q"] => Ok(ReplCommand::Quit),
            _ => Err(format!("unrecognised command: {line} (try 'help')")),
        }
    }
}

fn io_err(e: std::io::Error) -> CliError {
    InfraError::io("repl", e).into()
}

/// Run the session until `quit` or end of input.
pub fn run_repl<R: BufRead, W: Write>(
    session: &mut LedgerSession,
    opts: &RenderOptions,
    input: R,
    mut out: W,
) -> CliResult<()> {
    writeln!(out, "{}", render(session.current(), session.inputs(), opts)?).map_err(io_err)?;

    for line in input.lines() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("repl: {line}");

        let command = match line.parse::<ReplCommand>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "error: {message}").map_err(io_err)?;
                continue;
            }
        };

        match command {
            ReplCommand::Set { id, amount } => session.set_input(id, amount),
            ReplCommand::Submit { id, mode } => {
                if session.submit(&id, mode) {
                    writeln!(out, "{}", render(session.current(), session.inputs(), opts)?)
                        .map_err(io_err)?;
                } else {
                    writeln!(out, "error: unknown id: {id}").map_err(io_err)?;
                }
            }
            ReplCommand::Show => {
                writeln!(out, "{}", render(session.current(), session.inputs(), opts)?)
                    .map_err(io_err)?;
            }
            ReplCommand::Inputs => {
                for (id, amount) in session.inputs().iter() {
                    writeln!(out, "{id} = {amount}").map_err(io_err)?;
                }
            }
            ReplCommand::Clear => session.clear_inputs(),
            ReplCommand::Reset => session.reset(),
            ReplCommand::Help => writeln!(out, "{HELP}").map_err(io_err)?,
            ReplCommand::Quit => break,
        }
    }
    Ok(())
}
