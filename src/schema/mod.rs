//! Schema extraction
//!
//! A command is declared as an ordered list of [`ParamSpec`] plus documentation
//! text. Extraction validates the declaration and produces a neutral
//! [`Schema`]: parameter kinds, defaults, declared types and per-parameter help
//! pulled from `:name:` lines of the documentation.
//!
//! ```rust
//! use decli::schema::{ParamSpec, Schema, ValueType};
//!
//! let params = vec![
//!     ParamSpec::positional("name"),
//!     ParamSpec::positional("age").typed(ValueType::Int),
//!     ParamSpec::keyword("deaf", false),
//! ];
//! let schema = Schema::extract("greet", &params, "Greet someone\n\n:deaf: write louder", false).unwrap();
//! assert_eq!(schema.short_help(), "Greet someone");
//! assert_eq!(schema.param("deaf").unwrap().help, "write louder");
//! ```

pub mod doc;
pub mod value;

pub use doc::DocText;
pub use value::{Converter, FromValue, Value, ValueType};

use crate::error::RegistrationError;
use std::collections::HashSet;

/// How a parameter is filled from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// No default: a required positional
    Positional,
    /// Collects every remaining unclaimed positional token
    VariadicPositional,
    /// Has a default: an optional flag
    Keyword,
}

/// Default carried by a keyword parameter.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// A plain default value; its variant drives type inference.
    Value(Value),
    /// The default is a type marker: values are coerced with it and the
    /// command receives an empty string when the flag is absent.
    TypeMarker(ValueType),
}

/// One declared parameter of a command.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name; also the destination key handlers read.
    pub name: String,
    /// Positional, variadic or keyword.
    pub kind: ParamKind,
    /// Default, present for keyword parameters.
    pub default: Option<DefaultValue>,
    /// Explicit type annotation.
    pub declared_type: Option<ValueType>,
    /// Help fragment; filled from documentation when left empty.
    pub help: String,
}

impl ParamSpec {
    /// Required positional parameter.
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Positional,
            default: None,
            declared_type: None,
            help: String::new(),
        }
    }

    /// Variadic positional parameter.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::VariadicPositional,
            ..Self::positional(name)
        }
    }

    /// Keyword parameter with a default value.
    pub fn keyword(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            kind: ParamKind::Keyword,
            default: Some(DefaultValue::Value(default.into())),
            ..Self::positional(name)
        }
    }

    /// Keyword parameter whose default is a type marker.
    pub fn marker(name: impl Into<String>, marker: ValueType) -> Self {
        Self {
            kind: ParamKind::Keyword,
            default: Some(DefaultValue::TypeMarker(marker)),
            ..Self::positional(name)
        }
    }

    /// Attach a type annotation.
    pub fn typed(mut self, ty: ValueType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    /// Attach help text directly instead of through documentation.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Whether a default is declared.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Extracted description of a command declaration.
#[derive(Debug, Clone)]
pub struct Schema {
    params: Vec<ParamSpec>,
    doc: DocText,
    is_async: bool,
}

impl Schema {
    /// Validate `params` and attach help extracted from `doc`.
    pub fn extract(
        command: &str,
        params: &[ParamSpec],
        doc: &str,
        is_async: bool,
    ) -> Result<Self, RegistrationError> {
        let doc = DocText::parse(doc);
        let mut seen = HashSet::new();
        let mut variadic = 0;
        let mut extracted = Vec::with_capacity(params.len());

        for param in params {
            if !seen.insert(param.name.as_str()) {
                return Err(RegistrationError::DuplicateParameter {
                    command: command.to_string(),
                    param: param.name.clone(),
                });
            }
            if variadic > 0 && param.kind == ParamKind::Positional && !param.has_default() {
                return Err(RegistrationError::VariadicNotLast {
                    command: command.to_string(),
                    param: param.name.clone(),
                });
            }
            if param.kind == ParamKind::VariadicPositional {
                variadic += 1;
                if variadic > 1 {
                    return Err(RegistrationError::MultipleVariadic {
                        command: command.to_string(),
                    });
                }
            }

            let mut param = param.clone();
            // A default turns any declared parameter into a keyword flag.
            if param.kind == ParamKind::Positional && param.has_default() {
                param.kind = ParamKind::Keyword;
            }
            if param.help.is_empty() {
                param.help = doc.param_help(&param.name);
            }
            extracted.push(param);
        }

        Ok(Self {
            params: extracted,
            doc,
            is_async,
        })
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether the command declares `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// First documentation paragraph.
    pub fn short_help(&self) -> &str {
        self.doc.short()
    }

    /// Full cleaned documentation.
    pub fn long_help(&self) -> &str {
        self.doc.text()
    }

    /// Whether the handler must be awaited.
    pub fn is_async(&self) -> bool {
        self.is_async
    }
}
