//! Typed argument values and the coercions that produce them

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A parsed argument value handed to commands and wrappers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent value (an untyped `None` default)
    #[default]
    None,
    /// Boolean toggle
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Raw or string-typed value
    Str(String),
    /// Filesystem path
    Path(PathBuf),
    /// Repeated or multi-value argument
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// String slice, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List items, if this is a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Quoted rendering used in diagnostics (`'foo'` for strings).
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s),
            Value::Path(p) => format!("'{}'", p.display()),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::None)
    }
}

/// Extraction of a Rust type from a [`Value`].
pub trait FromValue: Sized {
    /// Convert, or describe why the value does not fit.
    fn from_value(value: &Value) -> Result<Self, String>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::None => Err("value is None".to_string()),
            Value::List(_) => Err(format!("expected a string, got {}", value.repr())),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_int()
            .ok_or_else(|| format!("expected an int, got {}", value.repr()))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_float()
            .ok_or_else(|| format!("expected a float, got {}", value.repr()))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_bool()
            .ok_or_else(|| format!("expected a bool, got {}", value.repr()))
    }
}

impl FromValue for PathBuf {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Path(p) => Ok(p.clone()),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(format!("expected a path, got {}", other.repr())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(format!("expected a list, got {}", other.repr())),
        }
    }
}

type ConvertFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;

/// A named single-argument coercion that rejects invalid input.
#[derive(Clone)]
pub struct Converter {
    name: String,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Wrap a conversion function. `name` appears in diagnostics.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Diagnostic name of the converter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the conversion.
    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("name", &self.name).finish()
    }
}

/// Declared or inferred type of a parameter.
#[derive(Debug, Clone)]
pub enum ValueType {
    /// String passthrough
    Str,
    /// `i64`
    Int,
    /// `f64`
    Float,
    /// `true`/`false` (flags become toggles)
    Bool,
    /// Filesystem path
    Path,
    /// Repeatable flag collecting strings
    List,
    /// Arbitrary coercion function
    Custom(Converter),
}

impl ValueType {
    /// Shorthand for [`ValueType::Custom`].
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        ValueType::Custom(Converter::new(name, func))
    }

    /// Infer a type from a default value. `None` defaults stay untyped.
    pub fn infer(default: &Value) -> Option<ValueType> {
        match default {
            Value::None => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::Str),
            Value::Path(_) => Some(ValueType::Path),
            Value::List(_) => Some(ValueType::List),
        }
    }

    /// Name used in `invalid <name> value` diagnostics.
    pub fn name(&self) -> &str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Path => "path",
            ValueType::List => "list",
            ValueType::Custom(c) => c.name(),
        }
    }

    /// Coerce one raw token. List elements are kept as strings.
    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        let invalid = || format!("invalid {} value: '{}'", self.name(), raw);
        match self {
            ValueType::Str | ValueType::List => Ok(Value::Str(raw.to_string())),
            ValueType::Int => raw.trim().parse().map(Value::Int).map_err(|_| invalid()),
            ValueType::Float => raw.trim().parse().map(Value::Float).map_err(|_| invalid()),
            ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            ValueType::Path => Ok(Value::Path(PathBuf::from(raw))),
            ValueType::Custom(c) => c.convert(raw).map_err(|e| {
                if e.is_empty() {
                    invalid()
                } else {
                    e
                }
            }),
        }
    }

    pub(crate) fn is_bool(&self) -> bool {
        matches!(self, ValueType::Bool)
    }

    pub(crate) fn is_list(&self) -> bool {
        matches!(self, ValueType::List)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_coercion() {
        assert_eq!(ValueType::Int.convert("33"), Ok(Value::Int(33)));
        assert_eq!(
            ValueType::Int.convert("notanint"),
            Err("invalid int value: 'notanint'".to_string())
        );
    }

    #[test]
    fn test_infer_from_default() {
        assert!(ValueType::infer(&Value::None).is_none());
        assert!(matches!(ValueType::infer(&Value::Int(22)), Some(ValueType::Int)));
        assert!(matches!(ValueType::infer(&Value::from(false)), Some(ValueType::Bool)));
        assert!(matches!(
            ValueType::infer(&Value::from(Vec::<String>::new())),
            Some(ValueType::List)
        ));
    }

    #[test]
    fn test_custom_converter_error_falls_back_to_generic_message() {
        let doubler = ValueType::custom("mytype", |raw| {
            if raw == "invalid" {
                Err(String::new())
            } else {
                Ok(Value::Str(format!("{}{}", raw, raw)))
            }
        });
        assert_eq!(doubler.convert("foo"), Ok(Value::from("foofoo")));
        assert_eq!(
            doubler.convert("invalid"),
            Err("invalid mytype value: 'invalid'".to_string())
        );
    }

    #[test]
    fn test_from_value_extraction() {
        assert_eq!(String::from_value(&Value::Int(9)).unwrap(), "9");
        assert_eq!(Option::<String>::from_value(&Value::None).unwrap(), None);
        let list = Value::from(vec!["foo", "bar"]);
        assert_eq!(
            Vec::<String>::from_value(&list).unwrap(),
            vec!["foo".to_string(), "bar".to_string()]
        );
        assert!(i64::from_value(&Value::from("x")).is_err());
    }

    #[test]
    fn test_list_display() {
        let list = Value::from(vec!["1", "2"]);
        assert_eq!(list.to_string(), "['1', '2']");
    }
}
