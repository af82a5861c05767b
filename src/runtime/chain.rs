//! Chain resolver - splits one token stream into consecutive commands
//!
//! Each command's segment is claimed by the token scanner, then validated by
//! the full top-level parser, so nothing runs until the whole stream parses.

use super::tokens::claim;
use crate::command::Args;
use crate::error::CliResult;
use crate::registry::{RegisteredCommand, Registry};
use clap::error::ErrorKind;
use std::iter;
use tracing::debug;

/// One resolved command with its parsed arguments.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub command: &'a RegisteredCommand,
    pub args: Args,
}

/// Resolve `tokens` (global options already removed) into ordered invocations.
pub(crate) fn resolve<'a>(
    registry: &'a Registry,
    parser: &clap::Command,
    tokens: &[String],
) -> CliResult<Vec<Invocation<'a>>> {
    let bin = parser.get_name().to_string();
    if tokens.is_empty() {
        return Err(reject(parser, &bin, tokens).into());
    }

    let mut invocations = Vec::new();
    let mut rest = tokens;
    while let Some(head) = rest.first() {
        let Some(command) = registry.find(head) else {
            return Err(reject(parser, &bin, rest).into());
        };

        let rules = command.rules()?;
        let claimed = claim(&rest[1..], &rules, |t| registry.is_command(t));
        let (segment, tail) = rest.split_at(1 + claimed);

        let matches = parser
            .clone()
            .try_get_matches_from(iter::once(bin.as_str()).chain(segment.iter().map(String::as_str)))?;
        let Some((_, sub)) = matches.subcommand() else {
            return Err(reject(parser, &bin, rest).into());
        };
        let args: Args = rules
            .iter()
            .map(|rule| (rule.dest.clone(), rule.extract(sub)))
            .collect();

        debug!(command = command.name(), tokens = segment.len(), "resolved segment");
        invocations.push(Invocation { command, args });
        rest = tail;
    }
    Ok(invocations)
}

/// Let the top-level parser report why `tokens` does not start a command.
fn reject(parser: &clap::Command, bin: &str, tokens: &[String]) -> clap::Error {
    let argv = iter::once(bin).chain(tokens.iter().map(String::as_str));
    match parser.clone().try_get_matches_from(argv) {
        Err(e) => e,
        Ok(_) => parser.clone().error(
            ErrorKind::InvalidSubcommand,
            format!(
                "unrecognized command '{}'",
                tokens.first().map(String::as_str).unwrap_or_default()
            ),
        ),
    }
}
