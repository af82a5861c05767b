//! Application configuration
//!
//! App metadata and global options can be declared in a TOML or JSON file
//! instead of code. Commands are always declared in code.
//!
//! ```toml
//! name = "deploy"
//! version = "1.2.0"
//! about = "Deploy things"
//!
//! [[globals]]
//! name = "host"
//! default = "example.org"
//! help = "target host"
//! ```

use crate::command::Overrides;
use crate::error::{CliError, CliResult};
use crate::schema::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Program name shown in usage lines
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub about: Option<String>,

    /// Global options shared by every command
    #[serde(default)]
    pub globals: Vec<GlobalOptionConfig>,
}

/// One global option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalOptionConfig {
    pub name: String,

    /// Default value; its type drives the flag form. Absent means untyped.
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub help: Option<String>,

    #[serde(default)]
    pub choices: Option<Vec<serde_json::Value>>,

    /// Explicit value type: str, int, float, bool, path or list
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,

    #[serde(default)]
    pub metavar: Option<String>,
}

impl GlobalOptionConfig {
    /// Convert into the override layer the rule builder consumes.
    pub fn into_overrides(self) -> CliResult<Overrides> {
        let mut overrides = Overrides::new();
        overrides.default = Some(match self.default {
            Some(value) => to_value(&self.name, value)?,
            None => Value::None,
        });
        overrides.help = self.help;
        overrides.metavar = self.metavar;
        if let Some(choices) = self.choices {
            overrides.choices = Some(
                choices
                    .into_iter()
                    .map(|c| to_value(&self.name, c))
                    .collect::<CliResult<_>>()?,
            );
        }
        if let Some(ty) = self.value_type {
            overrides.value_type = Some(parse_type(&self.name, &ty)?);
        }
        Ok(overrides)
    }
}

fn parse_type(option: &str, ty: &str) -> CliResult<ValueType> {
    match ty {
        "str" | "string" => Ok(ValueType::Str),
        "int" | "integer" => Ok(ValueType::Int),
        "float" => Ok(ValueType::Float),
        "bool" | "boolean" => Ok(ValueType::Bool),
        "path" => Ok(ValueType::Path),
        "list" => Ok(ValueType::List),
        other => Err(CliError::config(format!(
            "global \"{}\": unknown type \"{}\"",
            option, other
        ))),
    }
}

fn to_value(option: &str, raw: serde_json::Value) -> CliResult<Value> {
    match raw {
        serde_json::Value::Null => Ok(Value::None),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n.as_f64().map(Value::Float).ok_or_else(|| {
                CliError::config(format!("global \"{}\": number {} out of range", option, n))
            }),
        },
        serde_json::Value::String(s) => Ok(Value::Str(s)),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| to_value(option, item))
            .collect::<CliResult<Vec<_>>>()
            .map(Value::List),
        serde_json::Value::Object(_) => Err(CliError::config(format!(
            "global \"{}\": tables are not supported as values",
            option
        ))),
    }
}

fn read_config(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("{}: cannot read app config: {}", path.display(), e)))
}

impl AppConfig {
    /// Load app metadata and globals from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref();
        toml::from_str(&read_config(path)?).map_err(|e| {
            CliError::config(format!("{}: invalid TOML app config: {}", path.display(), e))
        })
    }

    /// Load app metadata and globals from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref();
        serde_json::from_str(&read_config(path)?).map_err(|e| {
            CliError::config(format!("{}: invalid JSON app config: {}", path.display(), e))
        })
    }

    /// Auto-detect format and load config
    pub fn from_file(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            // TOML first, then JSON
            _ => Self::from_toml_file(path).or_else(|_| Self::from_json_file(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            name = "test"
            version = "1.0.0"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.version.as_deref(), Some("1.0.0"));
        assert!(config.globals.is_empty());
    }

    #[test]
    fn test_global_defaults_convert() {
        let toml = r#"
            name = "test"

            [[globals]]
            name = "retries"
            default = 3
            choices = [1, 3, 5]

            [[globals]]
            name = "tags"
            default = ["a", "b"]

            [[globals]]
            name = "token"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        let mut globals = config.globals.into_iter();

        let retries = globals.next().unwrap().into_overrides().unwrap();
        assert_eq!(retries.default, Some(Value::Int(3)));
        assert_eq!(retries.choices.map(|c| c.len()), Some(3));

        let tags = globals.next().unwrap().into_overrides().unwrap();
        assert_eq!(tags.default, Some(Value::from(vec!["a", "b"])));

        let token = globals.next().unwrap().into_overrides().unwrap();
        assert_eq!(token.default, Some(Value::None));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"name": "test", "globals": [{"name": "x", "type": "complex"}]}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        let err = config.globals[0].clone().into_overrides().unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn test_table_value_rejected() {
        let json = r#"{"name": "test", "globals": [{"name": "x", "default": {"a": 1}}]}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!(config.globals[0].clone().into_overrides().is_err());
    }
}
