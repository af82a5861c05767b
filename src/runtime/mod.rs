//! Run entry point
//!
//! [`App`] owns the command registry, the global options and the wrappers.
//! A run parses globals, resolves the whole command chain, starts wrappers,
//! dispatches each command in order and finally finishes the wrappers.
//!
//! ```rust,no_run
//! use decli::prelude::*;
//!
//! fn main() -> CliResult<()> {
//!     let mut app = App::new("demo");
//!     app.global("host", "example.org")?;
//!     app.register(
//!         CommandSpec::new("ping")
//!             .doc("Ping the host")
//!             .param(ParamSpec::keyword("host", Value::None))
//!             .handler(|args| {
//!                 println!("ping {}", args.value::<String>("host")?);
//!                 Ok(())
//!             }),
//!     )?;
//!     app.run()
//! }
//! ```

pub mod chain;
pub mod globals;
pub(crate) mod tokens;
pub mod wrapper;


pub use chain::Invocation;
pub use globals::GlobalOptions;
pub use wrapper::{Teardown, WrapperSpec};

use crate::command::{Args, CommandSpec, Handler, Overrides};
use crate::error::{CliError, CliResult, RegistrationError};
use crate::registry::Registry;
use crate::schema::Value;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;
use wrapper::Lifecycle;

#[cfg(feature = "config")]
use crate::config::AppConfig;

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    // An interrupted sync command may still be running on the blocking pool
    runtime.shutdown_background();
    Ok(output)
}

/// Call a handler outside any run. Interrupts are swallowed.
pub(crate) fn call_blocking(handler: &Handler, args: Args) -> anyhow::Result<()> {
    let result = match handler {
        Handler::Sync(f) => f(args),
        Handler::Async(_) => block_on(handler.invoke(args))?,
    };
    match result {
        Err(e) if CliError::is_interrupt(&e) => Ok(()),
        other => other,
    }
}

/// A command-line application assembled from declarations.
#[derive(Debug, Default)]
pub struct App {
    name: String,
    version: Option<String>,
    about: Option<String>,
    author: Option<String>,
    registry: Registry,
    globals: GlobalOptions,
    wrappers: Vec<WrapperSpec>,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build an app from loaded configuration: metadata plus globals.
    #[cfg(feature = "config")]
    pub fn from_config(config: AppConfig) -> CliResult<Self> {
        let mut app = App::new(config.name);
        app.version = config.version;
        app.about = config.about;
        app.author = config.author;
        for global in config.globals {
            let name = global.name.clone();
            app.global_with(name, global.into_overrides()?)?;
        }
        Ok(app)
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a command. Registering the same identifier again merges its
    /// override layers into the existing entry.
    pub fn register(&mut self, spec: CommandSpec) -> Result<&mut Self, RegistrationError> {
        self.registry.register(spec)?;
        Ok(self)
    }

    /// Register a wrapper around every run.
    pub fn wrap(&mut self, wrapper: WrapperSpec) -> Result<&mut Self, RegistrationError> {
        wrapper.validate()?;
        debug!(wrapper = wrapper.name(), params = ?wrapper.params(), "registered wrapper");
        self.wrappers.push(wrapper);
        Ok(self)
    }

    /// Declare a global option with a default value.
    pub fn global(
        &mut self,
        name: impl Into<String>,
        default: impl Into<Value>,
    ) -> Result<&mut Self, RegistrationError> {
        self.global_with(name, Overrides::new().default_value(default))
    }

    /// Declare a global option with full control over its rule.
    pub fn global_with(
        &mut self,
        name: impl Into<String>,
        overrides: Overrides,
    ) -> Result<&mut Self, RegistrationError> {
        self.globals.add(name, overrides)?;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry access, for override layers added after registration.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn globals(&self) -> &GlobalOptions {
        &self.globals
    }

    /// Build the top-level parser: one sub-command per registered command.
    pub fn build_parser(&self) -> Result<clap::Command, RegistrationError> {
        let mut cmd = clap::Command::new(self.name.clone())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .args_override_self(true)
            .subcommand_help_heading("Available commands")
            .subcommand_value_name("COMMAND");
        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone());
        }
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        if let Some(author) = &self.author {
            cmd = cmd.author(author.clone());
        }
        for arg in self.globals.args()? {
            cmd = cmd.arg(arg);
        }
        for sub in self.registry.subcommands()? {
            cmd = cmd.subcommand(sub);
        }
        Ok(cmd)
    }

    /// Run with the process arguments. Invalid input prints a diagnostic and
    /// exits the process.
    pub fn run(&self) -> CliResult<()> {
        self.run_from(std::env::args().skip(1))
    }

    /// Run with explicit tokens (program name excluded). Invalid input prints
    /// a diagnostic and exits the process.
    pub fn run_from<I, T>(&self, tokens: I) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        match self.try_run_from(tokens) {
            Err(CliError::Parse(e)) => e.exit(),
            other => other,
        }
    }

    /// Run with explicit tokens, returning every failure.
    pub fn try_run_from<I, T>(&self, tokens: I) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        block_on(self.try_run_async(tokens))?
    }

    /// Run inside an existing async runtime.
    pub async fn try_run_async<I, T>(&self, tokens: I) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let parser = self.build_parser()?;
        let (globals, rest) = self.globals.parse_known(&tokens)?;
        let invocations = chain::resolve(&self.registry, &parser, &rest)?;
        debug!(commands = invocations.len(), "resolved command chain");

        let interrupt = tokio::signal::ctrl_c().fuse();
        tokio::pin!(interrupt);
        // Poll once so the handler is installed before anything runs
        let _ = interrupt.as_mut().now_or_never();

        let mut lifecycle = Lifecycle::new(&self.wrappers);
        let outcome = match lifecycle.start_all(&globals).await {
            Ok(()) => dispatch(invocations, &globals, interrupt).await,
            Err(e) => Err(e),
        };
        let finished = lifecycle.finish_all().await;
        outcome.and(finished)
    }
}

/// Start a command. Sync bodies go to the blocking pool so an interrupt can
/// be observed while they run.
fn spawn_call(handler: &Handler, args: Args) -> BoxFuture<'_, anyhow::Result<()>> {
    match handler {
        Handler::Sync(f) => {
            let f = Arc::clone(f);
            async move { tokio::task::spawn_blocking(move || f(args)).await? }.boxed()
        }
        Handler::Async(_) => handler.invoke(args).boxed(),
    }
}

/// Call each command in order, with matching globals merged in. An interrupt
/// stops the chain without an error.
async fn dispatch<I>(
    invocations: Vec<Invocation<'_>>,
    globals: &Args,
    mut interrupt: Pin<&mut I>,
) -> CliResult<()>
where
    I: Future<Output = std::io::Result<()>>,
{
    for Invocation { command, mut args } in invocations {
        for (name, value) in globals.iter() {
            if command.declares(name) {
                args.insert(name, value.clone());
            }
        }

        debug!(command = command.name(), "dispatching command");
        let call = spawn_call(command.handler(), args);
        let result = tokio::select! {
            biased;
            Ok(()) = &mut interrupt => Err(anyhow::Error::new(CliError::Interrupted)),
            result = call => result,
        };

        match result {
            Ok(()) => {}
            Err(e) if CliError::is_interrupt(&e) => {
                debug!(command = command.name(), "command interrupted, stopping chain");
                break;
            }
            Err(source) => {
                return Err(CliError::Command {
                    command: command.name().to_string(),
                    source,
                })
            }
        }
    }
    Ok(())
}

/// Register `spec` alone in a fresh app and run it with `tokens` (program
/// name excluded). Parse failures are returned, not exited on.
pub fn run_single<I, T>(spec: CommandSpec, tokens: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let ident = spec.ident().to_string();
    let mut app = App::new(ident.clone());
    app.register(spec)?;
    let name = app
        .registry()
        .get(&ident)
        .map(|c| c.name().to_string())
        .unwrap_or(ident);
    app.try_run_from(std::iter::once(name).chain(tokens.into_iter().map(Into::into)))
}
