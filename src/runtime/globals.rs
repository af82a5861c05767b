//! Global options shared by every command and wrapper of a run

use super::tokens::{self, FlagTable};
use crate::command::{build_rules, ArgumentRule, Args, Overrides};
use crate::error::{CliResult, RegistrationError};
use crate::schema::{ParamSpec, Value};
use std::collections::HashMap;
use tracing::debug;

const OWNER: &str = "global options";

/// Flags parsed ahead of any command and threaded into every command and
/// wrapper declaring a parameter of the same name.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    params: Vec<ParamSpec>,
    overrides: HashMap<String, Overrides>,
}

impl GlobalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a global option. Its default (from `overrides`, else none)
    /// drives the flag form the same way a command keyword does.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        overrides: Overrides,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if self.params.iter().any(|p| p.name == name) {
            return Err(RegistrationError::DuplicateGlobal(name));
        }

        let default = overrides.default.clone().unwrap_or(Value::None);
        self.params.push(ParamSpec::keyword(name.clone(), default));
        self.overrides.insert(name.clone(), overrides);
        if let Err(e) = self.rules() {
            self.params.pop();
            self.overrides.remove(&name);
            return Err(e);
        }
        debug!(global = %name, "declared global option");
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Build the argument rules of every global option.
    pub fn rules(&self) -> Result<Vec<ArgumentRule>, RegistrationError> {
        build_rules(OWNER, &self.params, |name| self.overrides.get(name))
    }

    /// Pull global flags (and their values) out of `tokens` wherever they
    /// appear before a literal `--` and parse them. Returns the resolved
    /// values, defaults included, and the untouched remainder in order.
    pub fn parse_known(&self, tokens: &[String]) -> CliResult<(Args, Vec<String>)> {
        if self.is_empty() {
            return Ok((Args::new(), tokens.to_vec()));
        }

        let rules = self.rules()?;
        let table = FlagTable::new(&rules);
        let mut extracted = Vec::new();
        let mut rest = Vec::with_capacity(tokens.len());
        let mut idx = 0;
        while idx < tokens.len() {
            if tokens[idx] == "--" {
                rest.extend_from_slice(&tokens[idx..]);
                break;
            }
            match table.lookup(&tokens[idx]) {
                Some(takes) => {
                    let end = tokens::skip_values(tokens, idx + 1, takes, |_| false);
                    extracted.extend_from_slice(&tokens[idx..end]);
                    idx = end;
                }
                None => {
                    rest.push(tokens[idx].clone());
                    idx += 1;
                }
            }
        }

        let parser = rules.iter().fold(
            clap::Command::new(OWNER)
                .no_binary_name(true)
                .disable_help_flag(true)
                .args_override_self(true),
            |cmd, rule| cmd.arg(rule.to_arg()),
        );
        let matches = parser.try_get_matches_from(&extracted)?;
        let values: Args = rules
            .iter()
            .map(|rule| (rule.dest.clone(), rule.extract(&matches)))
            .collect();

        debug!(
            extracted = extracted.len(),
            remaining = rest.len(),
            "parsed global options"
        );
        Ok((values, rest))
    }

    /// Clap arguments, shown in top-level help.
    pub(crate) fn args(&self) -> Result<Vec<clap::Arg>, RegistrationError> {
        Ok(self.rules()?.iter().map(ArgumentRule::to_arg).collect())
    }
}
