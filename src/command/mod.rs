//! Command declarations
//!
//! A [`CommandSpec`] is the builder-style replacement for decorating a
//! function: it names the command, lists its parameters in order, carries the
//! documentation that feeds help text, and owns the typed handler.
//!
//! ```rust
//! use decli::command::{CommandSpec, Overrides};
//! use decli::schema::{ParamSpec, ValueType};
//!
//! let greet = CommandSpec::new("greet")
//!     .doc("Greet someone\n\n:name: who to greet")
//!     .param(ParamSpec::positional("name"))
//!     .param(ParamSpec::positional("age").typed(ValueType::Int))
//!     .param(ParamSpec::keyword("deaf", false))
//!     .with("deaf", Overrides::new().help("write louder"))
//!     .handler(|args| {
//!         let name: String = args.value("name")?;
//!         println!("Hi {}!", name);
//!         Ok(())
//!     });
//! assert_eq!(greet.ident(), "greet");
//! ```

pub mod rule;

pub use rule::{build_rules, Arity, ArgumentRule, Overrides, RuleAction};

use crate::schema::{FromValue, ParamSpec, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Parsed arguments handed to a command or wrapper, keyed by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Typed access to one argument.
    pub fn value<T: FromValue>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("missing argument \"{}\"", name))?;
        T::from_value(value).map_err(|e| anyhow::anyhow!("argument \"{}\": {}", name, e))
    }

    /// Boolean argument; absent or non-boolean reads as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

/// Asynchronous command body.
#[async_trait]
pub trait AsyncCommand: Send + Sync {
    /// Run the command with its parsed arguments.
    async fn call(&self, args: Args) -> anyhow::Result<()>;
}

struct AsyncFn<F>(F);

#[async_trait]
impl<F, Fut> AsyncCommand for AsyncFn<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, args: Args) -> anyhow::Result<()> {
        (self.0)(args).await
    }
}

type SyncHandlerFn = dyn Fn(Args) -> anyhow::Result<()> + Send + Sync;

/// The callable behind a command: invoked directly or awaited.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<dyn AsyncCommand>),
}

impl Handler {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Handler::Async(Arc::new(AsyncFn(f)))
    }

    pub fn from_async<C: AsyncCommand + 'static>(command: C) -> Self {
        Handler::Async(Arc::new(command))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }

    /// Call the handler, awaiting it when asynchronous.
    pub async fn invoke(&self, args: Args) -> anyhow::Result<()> {
        match self {
            Handler::Sync(f) => f(args),
            Handler::Async(command) => command.call(args).await,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// What an override layer applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverrideTarget {
    /// The command itself (display name, summary, aliases)
    Command,
    /// One parameter, by its declared name
    Param(String),
}

/// Declaration of one command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    ident: String,
    doc: String,
    params: Vec<ParamSpec>,
    overrides: BTreeMap<OverrideTarget, Overrides>,
    handler: Option<Handler>,
}

impl CommandSpec {
    /// Start a declaration. `ident` is the command's identifier; underscores
    /// become hyphens in its display name.
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            doc: String::new(),
            params: Vec::new(),
            overrides: BTreeMap::new(),
            handler: None,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn params<I: IntoIterator<Item = ParamSpec>>(mut self, params: I) -> Self {
        self.params.extend(params);
        self
    }

    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handler = Some(Handler::from_fn(f));
        self
    }

    pub fn async_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handler = Some(Handler::from_async_fn(f));
        self
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Add an override layer for one parameter. Layers merge key by key.
    pub fn with(mut self, param: impl Into<String>, overrides: Overrides) -> Self {
        self.merge_overrides(OverrideTarget::Param(param.into()), overrides);
        self
    }

    /// Add an override layer for the command itself.
    pub fn with_command(mut self, overrides: Overrides) -> Self {
        self.merge_overrides(OverrideTarget::Command, overrides);
        self
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    pub fn declared_params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn handler_ref(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn overrides(&self) -> &BTreeMap<OverrideTarget, Overrides> {
        &self.overrides
    }

    pub fn overrides_for(&self, target: &OverrideTarget) -> Option<&Overrides> {
        self.overrides.get(target)
    }

    pub(crate) fn merge_overrides(&mut self, target: OverrideTarget, overrides: Overrides) {
        self.overrides.entry(target).or_default().merge(overrides);
    }

    pub(crate) fn take_overrides(&mut self) -> BTreeMap<OverrideTarget, Overrides> {
        std::mem::take(&mut self.overrides)
    }

    /// Call the handler directly, outside of any parser. Async handlers are
    /// driven on a fresh current-thread runtime; an interrupt is swallowed.
    pub fn call(&self, args: Args) -> anyhow::Result<()> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("command \"{}\" has no handler", self.ident))?;
        crate::runtime::call_blocking(handler, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::sync::Mutex;

    #[test]
    fn test_override_layers_merge() {
        let spec = CommandSpec::new("mycommand")
            .param(ParamSpec::positional("myparam"))
            .param(ParamSpec::positional("other"))
            .with("myparam", Overrides::new().choices(["a", "b"]))
            .with("other", Overrides::new().help("my other param help"))
            .with("myparam", Overrides::new().help("myparam help"));

        let myparam = spec
            .overrides_for(&OverrideTarget::Param("myparam".into()))
            .unwrap();
        assert_eq!(myparam.help.as_deref(), Some("myparam help"));
        assert_eq!(myparam.choices.as_ref().map(Vec::len), Some(2));
        assert!(spec
            .overrides_for(&OverrideTarget::Param("other".into()))
            .is_some());
    }

    #[test]
    fn test_direct_call_sync() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let spec = CommandSpec::new("mycommand")
            .param(ParamSpec::positional("param"))
            .handler(move |args| {
                sink.lock().unwrap().push(args.value::<String>("param")?);
                Ok(())
            });

        spec.call(Args::new().with("param", "myparam")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["myparam".to_string()]);
    }

    #[test]
    fn test_direct_call_async_and_interrupt_is_swallowed() {
        let spec = CommandSpec::new("mycommand").async_handler(|_args| async {
            Err(anyhow::Error::new(CliError::Interrupted))
        });
        assert!(spec.call(Args::new()).is_ok());
    }

    #[test]
    fn test_args_typed_access() {
        let args = Args::new().with("age", 30).with("name", "Alice");
        assert_eq!(args.value::<i64>("age").unwrap(), 30);
        assert_eq!(args.value::<String>("name").unwrap(), "Alice");
        assert!(args.value::<i64>("name").is_err());
        assert!(args.value::<String>("missing").is_err());
        assert!(!args.flag("deaf"));
    }
}
