//! Argument rule builder - maps a parameter plus overrides to a clap argument

use crate::error::RegistrationError;
use crate::schema::{DefaultValue, ParamKind, ParamSpec, Value, ValueType};
use clap::builder::ValueRange;
use clap::{Arg, ArgAction, ArgMatches};
use std::collections::{HashMap, HashSet};

/// Number of tokens a rule consumes per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value
    Single,
    /// A fixed count of values
    Exactly(usize),
    /// Any number of values, including none
    ZeroOrMore,
    /// At least one value
    OneOrMore,
}

impl Arity {
    fn range(self) -> ValueRange {
        match self {
            Arity::Single => ValueRange::new(1),
            Arity::Exactly(n) => ValueRange::new(n),
            Arity::ZeroOrMore => ValueRange::new(0..),
            Arity::OneOrMore => ValueRange::new(1..),
        }
    }

    /// Whether the rule keeps taking values until something stops it.
    pub fn is_unbounded(self) -> bool {
        matches!(self, Arity::ZeroOrMore | Arity::OneOrMore)
    }
}

/// What happens when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Store the coerced value(s)
    Store,
    /// Accumulate values across occurrences
    Append,
    /// Pure toggle; presence stores the carried boolean
    Toggle(bool),
}

/// Per-target keys a registration layer may override.
///
/// Every key supersedes only the computed value it names. For the command
/// target, `name` renames the command, `help` replaces its summary and
/// `aliases` adds alternative names.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub help: Option<String>,
    pub choices: Option<Vec<Value>>,
    pub nargs: Option<Arity>,
    pub name: Option<String>,
    pub value_type: Option<ValueType>,
    pub default: Option<Value>,
    pub metavar: Option<String>,
    pub aliases: Option<Vec<String>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn nargs(mut self, nargs: Arity) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value_type(mut self, ty: ValueType) -> Self {
        self.value_type = Some(ty);
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = Some(aliases.into_iter().map(Into::into).collect());
        self
    }

    /// Merge a later layer: keys it sets win, all others are kept.
    pub fn merge(&mut self, later: Overrides) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if later.$field.is_some() { self.$field = later.$field; })*
            };
        }
        take!(help, choices, nargs, name, value_type, default, metavar, aliases);
    }
}

/// Concrete parsing rule for one parameter.
#[derive(Debug, Clone)]
pub struct ArgumentRule {
    /// Key the parsed value is stored under (the parameter name)
    pub dest: String,
    /// Display name (may be renamed by an override)
    pub display: String,
    pub long: Option<String>,
    pub short: Option<char>,
    pub positional: bool,
    pub required: bool,
    pub arity: Arity,
    pub action: RuleAction,
    /// `None` passes raw strings through
    pub coercion: Option<ValueType>,
    pub default: Value,
    pub choices: Option<Vec<Value>>,
    pub help: String,
    pub metavar: Option<String>,
}

impl ArgumentRule {
    /// Derive the rule for `param`, letting `overrides` supersede computed keys.
    pub fn build(param: &ParamSpec, overrides: &Overrides) -> Self {
        let declared = overrides
            .value_type
            .clone()
            .or_else(|| param.declared_type.clone());
        let default = match &overrides.default {
            Some(value) => Some(DefaultValue::Value(value.clone())),
            None => param.default.clone(),
        };

        let mut rule = ArgumentRule {
            dest: param.name.clone(),
            display: overrides.name.clone().unwrap_or_else(|| param.name.clone()),
            long: None,
            short: None,
            positional: true,
            required: false,
            arity: overrides.nargs.unwrap_or(Arity::Single),
            action: RuleAction::Store,
            coercion: declared.clone(),
            default: Value::None,
            choices: overrides.choices.clone(),
            help: overrides.help.clone().unwrap_or_else(|| param.help.clone()),
            metavar: overrides.metavar.clone(),
        };

        if param.kind == ParamKind::VariadicPositional {
            rule.arity = overrides.nargs.unwrap_or(Arity::ZeroOrMore);
            rule.action = RuleAction::Append;
            rule.default = Value::List(Vec::new());
            return rule;
        }

        let Some(default) = default else {
            rule.required = true;
            return rule;
        };

        rule.positional = false;
        rule.long = Some(rule.display.replace('_', "-"));
        rule.short = short_flag(&rule.display);

        match default {
            DefaultValue::TypeMarker(marker) => {
                rule.coercion = Some(declared.unwrap_or(marker));
                rule.default = Value::Str(String::new());
            }
            DefaultValue::Value(value) => match declared.or_else(|| ValueType::infer(&value)) {
                Some(ty) if ty.is_bool() => {
                    let current = value.as_bool().unwrap_or(false);
                    rule.action = RuleAction::Toggle(!current);
                    rule.coercion = None;
                    rule.default = Value::Bool(current);
                }
                Some(ty) if ty.is_list() => {
                    rule.action = RuleAction::Append;
                    rule.coercion = None;
                    rule.default = value;
                }
                ty => {
                    rule.coercion = ty;
                    rule.default = value;
                }
            },
        }

        rule
    }

    /// Tokens consumed after the flag itself, per occurrence.
    pub fn values_per_occurrence(&self) -> Option<usize> {
        match (self.action, self.arity) {
            (RuleAction::Toggle(_), _) => Some(0),
            (_, Arity::Single) => Some(1),
            (_, Arity::Exactly(n)) => Some(n),
            _ => None,
        }
    }

    /// Build the clap argument for this rule.
    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.dest.clone()).help(self.help_text());

        if let Some(long) = &self.long {
            arg = arg.long(long.clone());
        }
        if let Some(short) = self.short {
            arg = arg.short(short);
        }

        match self.action {
            RuleAction::Toggle(true) => return arg.action(ArgAction::SetTrue),
            RuleAction::Toggle(false) => return arg.action(ArgAction::SetFalse),
            RuleAction::Store => arg = arg.action(ArgAction::Set),
            RuleAction::Append => arg = arg.action(ArgAction::Append),
        }

        let value_name = match &self.metavar {
            Some(metavar) => metavar.clone(),
            None if self.positional => self.display.clone(),
            None => self.display.to_uppercase(),
        };

        arg.value_name(value_name)
            .num_args(self.arity.range())
            .allow_negative_numbers(true)
            .required(self.required)
            .value_parser(self.value_parser())
    }

    /// Read this rule's value out of parsed matches, falling back to the default.
    pub fn extract(&self, matches: &ArgMatches) -> Value {
        match (self.action, self.arity) {
            (RuleAction::Toggle(_), _) => Value::Bool(matches.get_flag(&self.dest)),
            (RuleAction::Store, Arity::Single) => matches
                .get_one::<Value>(&self.dest)
                .cloned()
                .unwrap_or_else(|| self.default.clone()),
            _ => matches
                .get_many::<Value>(&self.dest)
                .map(|values| Value::List(values.cloned().collect()))
                .unwrap_or_else(|| self.default.clone()),
        }
    }

    fn value_parser(
        &self,
    ) -> impl Fn(&str) -> Result<Value, String> + Clone + Send + Sync + 'static {
        let coercion = self.coercion.clone();
        let choices = self.choices.clone();
        move |raw: &str| {
            let value = match &coercion {
                Some(ty) => ty.convert(raw)?,
                None => Value::Str(raw.to_string()),
            };
            if let Some(choices) = &choices {
                if !choices.contains(&value) {
                    let allowed: Vec<String> = choices.iter().map(Value::repr).collect();
                    return Err(format!(
                        "invalid choice: {} (choose from {})",
                        value.repr(),
                        allowed.join(", ")
                    ));
                }
            }
            Ok(value)
        }
    }

    fn help_text(&self) -> String {
        let mut help = self.help.clone();
        let mut push = |extra: String| {
            if !help.is_empty() {
                help.push(' ');
            }
            help.push_str(&extra);
        };

        if let Some(choices) = &self.choices {
            let values: Vec<String> = choices.iter().map(Value::to_string).collect();
            push(format!("[possible values: {}]", values.join(", ")));
        }
        let shows_default = !self.positional
            && !matches!(self.action, RuleAction::Toggle(_))
            && !self.default.is_none()
            && self.default != Value::Str(String::new())
            && self.default != Value::List(Vec::new());
        if shows_default {
            push(format!("[default: {}]", self.default));
        }
        help
    }
}

/// `-<first letter>`, unless the name has an underscore or would shadow `-h`.
fn short_flag(display: &str) -> Option<char> {
    if display.contains('_') {
        return None;
    }
    display
        .chars()
        .next()
        .filter(|c| c.is_ascii_alphanumeric() && *c != 'h')
}

/// Build every rule of one command and validate flag uniqueness.
///
/// When two rules want the same short letter, the later one keeps it.
pub fn build_rules<'a, F>(
    owner: &str,
    params: &[ParamSpec],
    overrides_for: F,
) -> Result<Vec<ArgumentRule>, RegistrationError>
where
    F: Fn(&str) -> Option<&'a Overrides>,
{
    let empty = Overrides::default();
    let mut rules: Vec<ArgumentRule> = params
        .iter()
        .map(|p| ArgumentRule::build(p, overrides_for(&p.name).unwrap_or(&empty)))
        .collect();

    let mut longs = HashSet::new();
    for rule in &rules {
        // clap's own help argument owns both the `help` id and `--help`
        if rule.dest == "help" || rule.long.as_deref() == Some("help") {
            return Err(RegistrationError::ReservedFlag {
                command: owner.to_string(),
                flag: match &rule.long {
                    Some(long) => format!("--{}", long),
                    None => rule.dest.clone(),
                },
            });
        }
        if let Some(long) = &rule.long {
            if !longs.insert(long.clone()) {
                return Err(RegistrationError::FlagCollision {
                    command: owner.to_string(),
                    flag: format!("--{}", long),
                });
            }
        }
    }

    let mut shorts: HashMap<char, usize> = HashMap::new();
    for idx in 0..rules.len() {
        if let Some(short) = rules[idx].short {
            if let Some(previous) = shorts.insert(short, idx) {
                rules[previous].short = None;
            }
        }
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn rule(param: ParamSpec) -> ArgumentRule {
        ArgumentRule::build(&param, &Overrides::default())
    }

    fn parse(rules: &[ArgumentRule], argv: &[&str]) -> Result<ArgMatches, clap::Error> {
        let cmd = rules
            .iter()
            .fold(Command::new("test").no_binary_name(true), |cmd, r| {
                cmd.arg(r.to_arg())
            });
        cmd.try_get_matches_from(argv.iter().copied())
    }

    #[test]
    fn test_no_default_is_required_positional() {
        let r = rule(ParamSpec::positional("param"));
        assert!(r.positional);
        assert!(r.required);
        assert!(r.long.is_none());
        assert!(r.short.is_none());
    }

    #[test]
    fn test_keyword_becomes_flag_with_short() {
        let r = rule(ParamSpec::keyword("param", "default"));
        assert!(!r.positional);
        assert_eq!(r.long.as_deref(), Some("param"));
        assert_eq!(r.short, Some('p'));
        assert_eq!(r.dest, "param");
    }

    #[test]
    fn test_underscore_name_has_no_short_and_hyphen_long() {
        let r = rule(ParamSpec::keyword("dry_run", false));
        assert_eq!(r.long.as_deref(), Some("dry-run"));
        assert_eq!(r.short, None);
        assert_eq!(r.dest, "dry_run");
    }

    #[test]
    fn test_help_letter_is_never_a_short() {
        let r = rule(ParamSpec::keyword("host", "example.org"));
        assert_eq!(r.short, None);
    }

    #[test]
    fn test_variadic_rule() {
        let r = rule(ParamSpec::variadic("params"));
        assert!(r.positional);
        assert!(!r.required);
        assert_eq!(r.arity, Arity::ZeroOrMore);
        assert!(r.short.is_none());
        assert_eq!(r.default, Value::List(vec![]));
    }

    #[test]
    fn test_bool_toggle_negates_default() {
        for default in [false, true] {
            let r = rule(ParamSpec::keyword("flag", default));
            assert_eq!(r.action, RuleAction::Toggle(!default));

            let present = parse(std::slice::from_ref(&r), &["--flag"]).unwrap();
            assert_eq!(r.extract(&present), Value::Bool(!default));

            let absent = parse(std::slice::from_ref(&r), &[]).unwrap();
            assert_eq!(r.extract(&absent), Value::Bool(default));
        }
    }

    #[test]
    fn test_list_default_appends() {
        let r = rule(ParamSpec::keyword("param", Vec::<String>::new()));
        let m = parse(std::slice::from_ref(&r), &["--param", "foo", "--param", "bar"]).unwrap();
        assert_eq!(r.extract(&m), Value::from(vec!["foo", "bar"]));
    }

    #[test]
    fn test_list_nargs_override() {
        let param = ParamSpec::keyword("param", vec![1, 2, 3, 4]);
        let r = ArgumentRule::build(&param, &Overrides::new().nargs(Arity::Exactly(4)));
        let m = parse(std::slice::from_ref(&r), &["--param", "1", "2", "3", "4"]).unwrap();
        assert_eq!(r.extract(&m), Value::from(vec!["1", "2", "3", "4"]));

        let err = parse(std::slice::from_ref(&r), &["--param", "1", "2", "3"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::WrongNumberOfValues);
    }

    #[test]
    fn test_default_type_is_used_for_coercion() {
        let r = rule(ParamSpec::keyword("param", 22));
        let m = parse(std::slice::from_ref(&r), &["--param", "33"]).unwrap();
        assert_eq!(r.extract(&m), Value::Int(33));
        let absent = parse(std::slice::from_ref(&r), &[]).unwrap();
        assert_eq!(r.extract(&absent), Value::Int(22));

        let err = parse(std::slice::from_ref(&r), &["-p", "notanint"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("invalid int value: 'notanint'"));
    }

    #[test]
    fn test_none_default_is_untyped() {
        let r = rule(ParamSpec::keyword("param", Value::None));
        assert!(r.coercion.is_none());
        let m = parse(std::slice::from_ref(&r), &["--param", "9"]).unwrap();
        assert_eq!(r.extract(&m), Value::from("9"));
        let absent = parse(std::slice::from_ref(&r), &[]).unwrap();
        assert_eq!(r.extract(&absent), Value::None);
    }

    #[test]
    fn test_type_marker_default() {
        let upper = ValueType::custom("upper", |raw| Ok(Value::Str(raw.to_uppercase())));
        let r = rule(ParamSpec::marker("param", upper));
        assert_eq!(r.default, Value::from(""));
        let m = parse(std::slice::from_ref(&r), &["--param", "abc"]).unwrap();
        assert_eq!(r.extract(&m), Value::from("ABC"));
        let absent = parse(std::slice::from_ref(&r), &[]).unwrap();
        assert_eq!(r.extract(&absent), Value::from(""));
    }

    #[test]
    fn test_override_supersedes_only_its_key() {
        let param = ParamSpec::positional("myparam")
            .typed(ValueType::Int)
            .help("from doc");
        let r = ArgumentRule::build(&param, &Overrides::new().choices([1, 2, 3, 4]));
        assert_eq!(r.help, "from doc");
        assert!(r.required);

        let ok = parse(std::slice::from_ref(&r), &["2"]).unwrap();
        assert_eq!(r.extract(&ok), Value::Int(2));
        let err = parse(std::slice::from_ref(&r), &["5"]).unwrap_err();
        assert!(err
            .to_string()
            .contains("invalid choice: 5 (choose from 1, 2, 3, 4)"));
    }

    #[test]
    fn test_display_rename_keeps_dest() {
        let param = ParamSpec::keyword("from_", Value::None);
        let r = ArgumentRule::build(&param, &Overrides::new().name("from"));
        assert_eq!(r.long.as_deref(), Some("from"));
        assert_eq!(r.short, Some('f'));
        assert_eq!(r.dest, "from_");
        let m = parse(std::slice::from_ref(&r), &["--from", "foo"]).unwrap();
        assert_eq!(r.extract(&m), Value::from("foo"));
    }

    #[test]
    fn test_override_merge_keeps_earlier_keys() {
        let mut ov = Overrides::new().choices(["foo", "bar"]);
        ov.merge(Overrides::new().help("later help"));
        assert!(ov.choices.is_some());
        assert_eq!(ov.help.as_deref(), Some("later help"));
    }

    #[test]
    fn test_short_conflict_later_wins() {
        let params = vec![
            ParamSpec::keyword("param", "a"),
            ParamSpec::keyword("path", "b"),
        ];
        let rules = build_rules("cmd", &params, |_| None).unwrap();
        assert_eq!(rules[0].short, None);
        assert_eq!(rules[1].short, Some('p'));
    }

    #[test]
    fn test_long_collision_is_rejected() {
        let params = vec![
            ParamSpec::keyword("dry_run", false),
            ParamSpec::keyword("dry-run", false),
        ];
        let err = build_rules("cmd", &params, |_| None).unwrap_err();
        assert!(matches!(err, RegistrationError::FlagCollision { .. }));
    }

    #[test]
    fn test_help_long_is_reserved() {
        let params = vec![ParamSpec::keyword("help", "x")];
        let err = build_rules("cmd", &params, |_| None).unwrap_err();
        assert!(matches!(err, RegistrationError::ReservedFlag { .. }));
    }

    #[test]
    fn test_help_destination_is_reserved() {
        let params = vec![ParamSpec::positional("help")];
        let err = build_rules("show", &params, |_| None).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ReservedFlag { ref flag, .. } if flag == "help"
        ));

        let renamed = Overrides::new().name("topic");
        let params = vec![ParamSpec::keyword("help", "x")];
        let err = build_rules("show", &params, |_| Some(&renamed)).unwrap_err();
        assert!(matches!(err, RegistrationError::ReservedFlag { .. }));
    }
}
