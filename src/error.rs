//! Error types for registration, parsing and execution

use thiserror::Error;

/// Result type for decli operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors raised while declaring commands, wrappers or global options.
///
/// These surface synchronously from the registration call and name the
/// offending declaration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A wrapper declared without a start body never suspends
    #[error("wrapper \"{wrapper}\" needs to yield: declare a start body returning a teardown")]
    MissingSuspension { wrapper: String },

    /// A command declared without a handler
    #[error("command \"{command}\" has no handler")]
    MissingHandler { command: String },

    /// Two parameters share a destination key
    #[error("command \"{command}\" declares parameter \"{param}\" twice")]
    DuplicateParameter { command: String, param: String },

    /// More than one variadic positional
    #[error("command \"{command}\" declares more than one variadic parameter")]
    MultipleVariadic { command: String },

    /// A required positional declared after the variadic one
    #[error("command \"{command}\": positional \"{param}\" follows the variadic parameter")]
    VariadicNotLast { command: String, param: String },

    /// An override targets a parameter the command does not declare
    #[error("command \"{command}\" has no parameter \"{param}\" to override")]
    UnknownParameter { command: String, param: String },

    /// Two rules of one command display the same flag
    #[error("command \"{command}\": flag \"{flag}\" is used by more than one parameter")]
    FlagCollision { command: String, flag: String },

    /// A parameter would shadow the help flag
    #[error("command \"{command}\": flag \"{flag}\" is reserved")]
    ReservedFlag { command: String, flag: String },

    /// Two commands share a primary name
    #[error("command name \"{0}\" is already registered")]
    DuplicateCommand(String),

    /// An override targets a command that was never registered
    #[error("no command \"{0}\" is registered")]
    UnknownCommand(String),

    /// A global option declared twice
    #[error("global option \"{0}\" is declared twice")]
    DuplicateGlobal(String),
}

/// Errors returned by the run entry points
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid declaration
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Command-line input did not form a valid chain (includes help/version
    /// display requests, which clap reports through its error type)
    #[error(transparent)]
    Parse(#[from] clap::Error),

    /// A command body failed; wrappers were already finished
    #[error("Command \"{command}\" failed: {source}")]
    Command {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// A wrapper failed before or after its suspension point
    #[error("Wrapper \"{wrapper}\" failed: {source}")]
    Wrapper {
        wrapper: String,
        #[source]
        source: anyhow::Error,
    },

    /// The user interrupted a command; handlers may return this to stop the
    /// chain silently
    #[error("Interrupted")]
    Interrupted,

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Create a config error with context
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error is a parse error (including help/version display).
    pub fn is_parse(&self) -> bool {
        matches!(self, CliError::Parse(_))
    }

    /// The clap error kind, for parse errors.
    pub fn parse_kind(&self) -> Option<clap::error::ErrorKind> {
        match self {
            CliError::Parse(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Whether an `anyhow` error returned by a handler is an interrupt.
    pub(crate) fn is_interrupt(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<CliError>(), Some(CliError::Interrupted))
    }
}
