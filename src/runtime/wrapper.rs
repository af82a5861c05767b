//! Wrapper lifecycle - before/after bracketing of a whole run
//!
//! A wrapper's start body runs before the first command and hands back a
//! [`Teardown`], the part that runs after the last command. Every started
//! wrapper is finished, whatever happened in between.

use crate::command::Args;
use crate::error::{CliError, CliResult, RegistrationError};
use crate::schema::Value;
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type TeardownFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// The half of a wrapper that runs after the commands.
pub enum Teardown {
    Sync(TeardownFn),
    Async(BoxFuture<'static, anyhow::Result<()>>),
    /// The wrapper finished before suspending; nothing runs afterwards.
    Complete,
}

impl Teardown {
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Teardown::Sync(Box::new(f))
    }

    pub fn future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Teardown::Async(Box::pin(fut))
    }

    pub fn complete() -> Self {
        Teardown::Complete
    }

    async fn run(self) -> anyhow::Result<()> {
        match self {
            Teardown::Sync(f) => f(),
            Teardown::Async(fut) => fut.await,
            Teardown::Complete => Ok(()),
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Teardown::Sync(_) => f.write_str("Teardown::Sync"),
            Teardown::Async(_) => f.write_str("Teardown::Async"),
            Teardown::Complete => f.write_str("Teardown::Complete"),
        }
    }
}

type StartFn = dyn Fn(Args) -> anyhow::Result<Teardown> + Send + Sync;
type AsyncStartFn = dyn Fn(Args) -> BoxFuture<'static, anyhow::Result<Teardown>> + Send + Sync;

#[derive(Clone)]
enum StartBody {
    Sync(Arc<StartFn>),
    Async(Arc<AsyncStartFn>),
}

/// Declaration of a wrapper.
#[derive(Clone)]
pub struct WrapperSpec {
    name: String,
    params: Vec<String>,
    start: Option<StartBody>,
}

impl WrapperSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            start: None,
        }
    }

    /// Declare a parameter, filled from the global option of the same name.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Teardown> + Send + Sync + 'static,
    {
        self.start = Some(StartBody::Sync(Arc::new(f)));
        self
    }

    pub fn on_start_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Teardown>> + Send + 'static,
    {
        self.start = Some(StartBody::Async(Arc::new(move |args| f(args).boxed())));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// A wrapper without a start body has no suspension point.
    pub(crate) fn validate(&self) -> Result<(), RegistrationError> {
        match self.start {
            Some(_) => Ok(()),
            None => Err(RegistrationError::MissingSuspension {
                wrapper: self.name.clone(),
            }),
        }
    }

    /// Arguments for the start body: each declared name from the globals,
    /// `Value::None` when no global matches.
    fn args_from(&self, globals: &Args) -> Args {
        self.params
            .iter()
            .map(|name| {
                let value = globals.get(name).cloned().unwrap_or(Value::None);
                (name.clone(), value)
            })
            .collect()
    }

    async fn start(&self, globals: &Args) -> anyhow::Result<Teardown> {
        let args = self.args_from(globals);
        match &self.start {
            Some(StartBody::Sync(f)) => f(args),
            Some(StartBody::Async(f)) => f(args).await,
            None => Ok(Teardown::Complete),
        }
    }
}

impl fmt::Debug for WrapperSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Where one wrapper is within a run.
#[derive(Debug)]
pub(crate) enum WrapperState {
    Registered,
    Started(Teardown),
    Finished,
}

/// Per-run state of every registered wrapper.
#[derive(Debug)]
pub(crate) struct Lifecycle<'a> {
    entries: Vec<(&'a WrapperSpec, WrapperState)>,
}

impl<'a> Lifecycle<'a> {
    pub(crate) fn new(wrappers: &'a [WrapperSpec]) -> Self {
        Self {
            entries: wrappers
                .iter()
                .map(|w| (w, WrapperState::Registered))
                .collect(),
        }
    }

    /// Start every wrapper in registration order; stops at the first failure.
    pub(crate) async fn start_all(&mut self, globals: &Args) -> CliResult<()> {
        for (wrapper, state) in &mut self.entries {
            let teardown = wrapper
                .start(globals)
                .await
                .map_err(|source| CliError::Wrapper {
                    wrapper: wrapper.name.clone(),
                    source,
                })?;
            debug!(wrapper = %wrapper.name, "wrapper started");
            *state = WrapperState::Started(teardown);
        }
        Ok(())
    }

    /// Finish every started wrapper in registration order. All of them run;
    /// the first failure is returned.
    pub(crate) async fn finish_all(&mut self) -> CliResult<()> {
        let mut first_error = None;
        for (wrapper, state) in &mut self.entries {
            let WrapperState::Started(teardown) =
                std::mem::replace(state, WrapperState::Finished)
            else {
                continue;
            };
            let result = teardown.run().await;
            debug!(wrapper = %wrapper.name, ok = result.is_ok(), "wrapper finished");
            if let Err(source) = result {
                first_error.get_or_insert(CliError::Wrapper {
                    wrapper: wrapper.name.clone(),
                    source,
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    #[cfg(test)]
    fn states(&self) -> Vec<&WrapperState> {
        self.entries.iter().map(|(_, state)| state).collect()
    }
}
