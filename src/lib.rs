//! decli - declarative command-line interfaces
//!
//! Commands are declared as plain handlers plus an ordered parameter list and
//! documentation. decli derives a `clap` parser from each declaration and
//! dispatches a single command line to one or several chained commands:
//!
//! - **`schema`** - parameter declarations, values and doc-derived help
//! - **`command`** - command declarations, override layers and argument rules
//! - **`registry`** - registered commands, names and aliases
//! - **`runtime`** - the [`App`]: global options, chain resolution, wrappers
//! - **`config`** - app metadata and globals from TOML/JSON files
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! decli = { version = "0.1", default-features = false }
//! # config file loading (on by default)
//! decli = { version = "0.1", features = ["config"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use decli::prelude::*;
//!
//! let mut app = App::new("greeter");
//! app.register(
//!     CommandSpec::new("greet")
//!         .doc("Greet someone\n\n:name: who to greet\n:times: how many times")
//!         .param(ParamSpec::positional("name"))
//!         .param(ParamSpec::keyword("times", 1))
//!         .handler(|args| {
//!             for _ in 0..args.value::<i64>("times")? {
//!                 println!("Hello {}!", args.value::<String>("name")?);
//!             }
//!             Ok(())
//!         }),
//! )
//! .unwrap();
//!
//! app.try_run_from(["greet", "Alice", "--times", "2"]).unwrap();
//! ```

pub mod command;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod schema;

/// Configuration loading (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

pub use command::{Args, CommandSpec, Handler, Overrides};
pub use error::{CliError, CliResult, RegistrationError};
pub use runtime::{run_single, App, Teardown, WrapperSpec};
pub use schema::{ParamSpec, Value, ValueType};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::command::{Args, Arity, AsyncCommand, CommandSpec, Handler, Overrides};
    pub use crate::error::{CliError, CliResult, RegistrationError};
    pub use crate::runtime::{run_single, App, GlobalOptions, Teardown, WrapperSpec};
    pub use crate::schema::{FromValue, ParamSpec, Value, ValueType};

    #[cfg(feature = "config")]
    pub use crate::config::{AppConfig, GlobalOptionConfig};
}
