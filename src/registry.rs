//! Command registry - ordered collection of registered commands
//!
//! Registration extracts each declaration's schema once and validates its
//! argument rules. Registering the same identifier again never adds a second
//! entry; its override layers are merged into the stored ones instead.

use crate::command::{build_rules, ArgumentRule, Args, CommandSpec, Handler, OverrideTarget, Overrides};
use crate::error::RegistrationError;
use crate::schema::Schema;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A command after registration.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    ident: String,
    name: String,
    aliases: Vec<String>,
    schema: Schema,
    overrides: BTreeMap<OverrideTarget, Overrides>,
    handler: Handler,
}

impl RegisteredCommand {
    fn new(mut spec: CommandSpec) -> Result<Self, RegistrationError> {
        let handler = spec
            .handler_ref()
            .cloned()
            .ok_or_else(|| RegistrationError::MissingHandler {
                command: spec.ident().to_string(),
            })?;
        let schema = Schema::extract(
            spec.ident(),
            spec.declared_params(),
            spec.doc_text(),
            handler.is_async(),
        )?;
        let (name, aliases) = display_names(spec.ident(), None);

        let mut command = Self {
            ident: spec.ident().to_string(),
            name,
            aliases,
            schema,
            overrides: BTreeMap::new(),
            handler,
        };
        for (target, layer) in spec.take_overrides() {
            command.apply_override(target, layer)?;
        }
        command.rules()?;
        Ok(command)
    }

    fn apply_override(
        &mut self,
        target: OverrideTarget,
        layer: Overrides,
    ) -> Result<(), RegistrationError> {
        if let OverrideTarget::Param(param) = &target {
            if !self.schema.declares(param) {
                return Err(RegistrationError::UnknownParameter {
                    command: self.ident.clone(),
                    param: param.clone(),
                });
            }
        }

        let is_command = target == OverrideTarget::Command;
        self.overrides.entry(target).or_default().merge(layer);
        if is_command {
            let (name, aliases) =
                display_names(&self.ident, self.overrides.get(&OverrideTarget::Command));
            self.name = name;
            self.aliases = aliases;
        }
        Ok(())
    }

    /// Identifier the command was declared with.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Primary display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared aliases (the registry may hand an alias to a later command).
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Summary shown in the top-level command list.
    pub fn summary(&self) -> &str {
        self.overrides
            .get(&OverrideTarget::Command)
            .and_then(|o| o.help.as_deref())
            .unwrap_or_else(|| self.schema.short_help())
    }

    /// Rebuild this command's argument rules.
    pub fn rules(&self) -> Result<Vec<ArgumentRule>, RegistrationError> {
        build_rules(&self.name, self.schema.params(), |param| {
            self.overrides.get(&OverrideTarget::Param(param.to_string()))
        })
    }

    /// Whether the command declares a parameter called `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.schema.declares(name)
    }

    /// Build the clap sub-command with the given alias slots.
    pub(crate) fn to_command(&self, aliases: &[&str]) -> Result<clap::Command, RegistrationError> {
        let mut cmd = clap::Command::new(self.name.clone())
            .about(self.summary().to_string())
            .args_override_self(true);
        if self.schema.long_help() != self.summary() && !self.schema.long_help().is_empty() {
            cmd = cmd.long_about(self.schema.long_help().to_string());
        }
        for alias in aliases {
            cmd = cmd.visible_alias(alias.to_string());
        }
        for rule in self.rules()? {
            cmd = cmd.arg(rule.to_arg());
        }
        Ok(cmd)
    }

    /// Call the handler directly, outside of any parser.
    pub fn call(&self, args: Args) -> anyhow::Result<()> {
        crate::runtime::call_blocking(&self.handler, args)
    }
}

/// Primary name and aliases: underscores become hyphens and the original
/// identifier is kept as an alias; a command override may rename or add more.
fn display_names(ident: &str, overrides: Option<&Overrides>) -> (String, Vec<String>) {
    let mut name = ident.to_string();
    let mut aliases = Vec::new();
    if ident.contains('_') {
        aliases.push(ident.to_string());
        name = ident.replace('_', "-");
    }
    if let Some(overrides) = overrides {
        if let Some(renamed) = &overrides.name {
            name = renamed.clone();
        }
        if let Some(extra) = &overrides.aliases {
            aliases.extend(extra.iter().cloned());
        }
    }
    aliases.retain(|alias| alias != &name);
    aliases.dedup();
    (name, aliases)
}

/// Ordered collection of registered commands.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Vec<RegisteredCommand>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, or merge its override layers into the existing
    /// entry registered under the same identifier.
    pub fn register(&mut self, mut spec: CommandSpec) -> Result<(), RegistrationError> {
        if let Some(idx) = self.position(spec.ident()) {
            let layers = spec.take_overrides();
            debug!(command = spec.ident(), layers = layers.len(), "merging override layers");
            return self.merge_layers(idx, layers);
        }

        let command = RegisteredCommand::new(spec)?;
        if self.commands.iter().any(|c| c.name == command.name) {
            return Err(RegistrationError::DuplicateCommand(command.name.clone()));
        }
        debug!(
            command = command.name(),
            aliases = ?command.aliases(),
            is_async = command.schema().is_async(),
            "registered command"
        );
        self.commands.push(command);
        Ok(())
    }

    /// Add an override layer for one parameter of a registered command.
    pub fn override_param(
        &mut self,
        ident: &str,
        param: impl Into<String>,
        overrides: Overrides,
    ) -> Result<(), RegistrationError> {
        let idx = self
            .position(ident)
            .ok_or_else(|| RegistrationError::UnknownCommand(ident.to_string()))?;
        let mut layers = BTreeMap::new();
        layers.insert(OverrideTarget::Param(param.into()), overrides);
        self.merge_layers(idx, layers)
    }

    /// Add an override layer for a registered command itself.
    pub fn override_command(
        &mut self,
        ident: &str,
        overrides: Overrides,
    ) -> Result<(), RegistrationError> {
        let idx = self
            .position(ident)
            .ok_or_else(|| RegistrationError::UnknownCommand(ident.to_string()))?;
        let mut layers = BTreeMap::new();
        layers.insert(OverrideTarget::Command, overrides);
        self.merge_layers(idx, layers)
    }

    fn merge_layers(
        &mut self,
        idx: usize,
        layers: BTreeMap<OverrideTarget, Overrides>,
    ) -> Result<(), RegistrationError> {
        let mut updated = self.commands[idx].clone();
        for (target, layer) in layers {
            updated.apply_override(target, layer)?;
        }
        updated.rules()?;
        let clash = self
            .commands
            .iter()
            .enumerate()
            .any(|(i, c)| i != idx && c.name == updated.name);
        if clash {
            return Err(RegistrationError::DuplicateCommand(updated.name));
        }
        self.commands[idx] = updated;
        Ok(())
    }

    fn position(&self, ident: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.ident == ident)
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> &[RegisteredCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Look a command up by its identifier.
    pub fn get(&self, ident: &str) -> Option<&RegisteredCommand> {
        self.position(ident).map(|idx| &self.commands[idx])
    }

    /// Resolve a command-line token: primary names first, then alias slots.
    pub fn find(&self, token: &str) -> Option<&RegisteredCommand> {
        self.commands
            .iter()
            .find(|c| c.name == token)
            .or_else(|| self.alias_slots().get(token).map(|&idx| &self.commands[idx]))
    }

    /// Whether `token` names a registered command or alias.
    pub fn is_command(&self, token: &str) -> bool {
        self.find(token).is_some()
    }

    /// Alias to owning command. The last registration claiming an alias wins;
    /// aliases shadowing a primary name are dropped.
    fn alias_slots(&self) -> HashMap<&str, usize> {
        let mut slots = HashMap::new();
        for (idx, command) in self.commands.iter().enumerate() {
            for alias in &command.aliases {
                if self.commands.iter().any(|c| &c.name == alias) {
                    continue;
                }
                slots.insert(alias.as_str(), idx);
            }
        }
        slots
    }

    /// Build one clap sub-command per registered command.
    pub(crate) fn subcommands(&self) -> Result<Vec<clap::Command>, RegistrationError> {
        let slots = self.alias_slots();
        self.commands
            .iter()
            .enumerate()
            .map(|(idx, command)| {
                let owned: Vec<&str> = command
                    .aliases
                    .iter()
                    .map(String::as_str)
                    .filter(|alias| slots.get(alias) == Some(&idx))
                    .collect();
                command.to_command(&owned)
            })
            .collect()
    }
}
