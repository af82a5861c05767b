//! Token scanner - decides how many raw tokens a set of rules claims

use crate::command::{Arity, ArgumentRule};
use std::collections::HashMap;

/// Values a flag takes after itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Takes {
    Nothing,
    Exactly(usize),
    Unbounded,
}

impl Takes {
    fn of(rule: &ArgumentRule) -> Self {
        match rule.values_per_occurrence() {
            Some(0) => Takes::Nothing,
            Some(n) => Takes::Exactly(n),
            None => Takes::Unbounded,
        }
    }
}

/// Long and short flags of a rule set, with what each one takes.
#[derive(Debug, Default)]
pub(crate) struct FlagTable {
    longs: HashMap<String, Takes>,
    shorts: HashMap<char, Takes>,
}

impl FlagTable {
    pub(crate) fn new(rules: &[ArgumentRule]) -> Self {
        let mut table = Self::default();
        for rule in rules.iter().filter(|r| !r.positional) {
            let takes = Takes::of(rule);
            if let Some(long) = &rule.long {
                table.longs.insert(long.clone(), takes);
            }
            if let Some(short) = rule.short {
                table.shorts.insert(short, takes);
            }
        }
        table
    }

    /// Include `-h`/`--help` as value-less flags.
    pub(crate) fn with_help(mut self) -> Self {
        self.longs.insert("help".to_string(), Takes::Nothing);
        self.shorts.insert('h', Takes::Nothing);
        self
    }

    /// Match one token against the table. A value attached with `=` or glued
    /// to a short flag means nothing more is taken.
    pub(crate) fn lookup(&self, token: &str) -> Option<Takes> {
        if let Some(long) = token.strip_prefix("--") {
            return match long.split_once('=') {
                Some((name, _)) => self.longs.get(name).map(|_| Takes::Nothing),
                None => self.longs.get(long).copied(),
            };
        }

        let short = token.strip_prefix('-')?;
        if is_number(token) {
            return None;
        }
        let mut chars = short.chars();
        let letter = chars.next()?;
        let takes = *self.shorts.get(&letter)?;
        if chars.as_str().is_empty() {
            Some(takes)
        } else {
            Some(Takes::Nothing)
        }
    }
}

/// Negative numbers are values, not flags.
pub(crate) fn is_number(token: &str) -> bool {
    let Some(rest) = token.strip_prefix('-') else {
        return false;
    };
    rest.starts_with(|c: char| c.is_ascii_digit() || c == '.') && rest.parse::<f64>().is_ok()
}

/// Whether a token reads as an option rather than a value.
pub(crate) fn looks_like_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && !is_number(token)
}

/// Advance past the values a matched flag takes, starting at `start`.
pub(crate) fn skip_values<F>(tokens: &[String], start: usize, takes: Takes, stop: F) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut idx = start;
    match takes {
        Takes::Nothing => {}
        Takes::Exactly(n) => {
            while idx < start + n && idx < tokens.len() && !looks_like_flag(&tokens[idx]) {
                idx += 1;
            }
        }
        Takes::Unbounded => {
            while idx < tokens.len() && !looks_like_flag(&tokens[idx]) && !stop(&tokens[idx]) {
                idx += 1;
            }
        }
    }
    idx
}

/// Count how many tokens following a command head belong to that command.
///
/// Flags claim their values; positional slots fill in declaration order. A
/// variadic slot gives way to a token naming another command, but a required
/// value is always taken. Unknown flags are claimed so the parser can report
/// them against the right command. A literal `--` and everything after it
/// belong to the current command.
pub(crate) fn claim<F>(tokens: &[String], rules: &[ArgumentRule], is_command: F) -> usize
where
    F: Fn(&str) -> bool,
{
    let flags = FlagTable::new(rules).with_help();
    let slots: Vec<&ArgumentRule> = rules.iter().filter(|r| r.positional).collect();
    let mut slot = 0;
    let mut filled = 0;
    let mut idx = 0;

    while idx < tokens.len() {
        let token = tokens[idx].as_str();
        if token == "--" {
            return tokens.len();
        }
        if let Some(takes) = flags.lookup(token) {
            idx = skip_values(tokens, idx + 1, takes, &is_command);
            continue;
        }
        if looks_like_flag(token) {
            idx += 1;
            continue;
        }

        let Some(rule) = slots.get(slot) else {
            break;
        };
        match rule.arity {
            Arity::Single => {
                slot += 1;
            }
            Arity::Exactly(n) => {
                filled += 1;
                if filled >= n {
                    slot += 1;
                    filled = 0;
                }
            }
            Arity::ZeroOrMore | Arity::OneOrMore => {
                let minimum = usize::from(rule.arity == Arity::OneOrMore);
                if filled >= minimum && is_command(token) {
                    break;
                }
                filled += 1;
            }
        }
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{build_rules, Overrides};
    use crate::schema::ParamSpec;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn rules(params: &[ParamSpec]) -> Vec<ArgumentRule> {
        build_rules("test", params, |_| None).unwrap()
    }

    #[test]
    fn test_negative_numbers_are_values() {
        assert!(is_number("-5"));
        assert!(is_number("-2.5"));
        assert!(!is_number("-x"));
        assert!(!is_number("-inf"));
        assert!(looks_like_flag("--name"));
        assert!(!looks_like_flag("-3"));
        assert!(!looks_like_flag("-"));
    }

    #[test]
    fn test_lookup_forms() {
        let rules = rules(&[ParamSpec::keyword("name", "x"), ParamSpec::keyword("loud", false)]);
        let table = FlagTable::new(&rules);
        assert_eq!(table.lookup("--name"), Some(Takes::Exactly(1)));
        assert_eq!(table.lookup("-n"), Some(Takes::Exactly(1)));
        assert_eq!(table.lookup("--name=bob"), Some(Takes::Nothing));
        assert_eq!(table.lookup("-nbob"), Some(Takes::Nothing));
        assert_eq!(table.lookup("--loud"), Some(Takes::Nothing));
        assert_eq!(table.lookup("--other"), None);
        assert_eq!(table.lookup("value"), None);
    }

    #[test]
    fn test_claim_single_positional_leaves_rest() {
        let rules = rules(&[ParamSpec::positional("param")]);
        let stream = tokens(&["success", "failed"]);
        assert_eq!(claim(&stream, &rules, |_| false), 1);
    }

    #[test]
    fn test_claim_flags_anywhere() {
        let rules = rules(&[ParamSpec::positional("name"), ParamSpec::keyword("times", 1)]);
        let stream = tokens(&["--times", "3", "bob", "next"]);
        assert_eq!(claim(&stream, &rules, |t| t == "next"), 3);
    }

    #[test]
    fn test_variadic_stops_at_command() {
        let rules = rules(&[ParamSpec::variadic("params")]);
        let stream = tokens(&["a", "b", "other", "c"]);
        assert_eq!(claim(&stream, &rules, |t| t == "other"), 2);
    }

    #[test]
    fn test_required_positional_takes_command_name() {
        let rules = rules(&[ParamSpec::positional("target")]);
        let stream = tokens(&["other", "other"]);
        assert_eq!(claim(&stream, &rules, |t| t == "other"), 1);
    }

    #[test]
    fn test_fixed_count_values() {
        let param = ParamSpec::keyword("param", vec![1, 2]);
        let rules = vec![ArgumentRule::build(&param, &Overrides::new().nargs(Arity::Exactly(2)))];
        let stream = tokens(&["--param", "1", "-2", "tail"]);
        assert_eq!(claim(&stream, &rules, |_| false), 3);
    }

    #[test]
    fn test_double_dash_claims_the_rest() {
        let rules = rules(&[ParamSpec::positional("param")]);
        let stream = tokens(&["--", "-x"]);
        assert_eq!(claim(&stream, &rules, |_| false), 2);

        let stream = tokens(&["a", "--", "next", "b"]);
        assert_eq!(claim(&stream, &rules, |t| t == "next"), 4);
    }

    #[test]
    fn test_help_is_claimed() {
        let rules = rules(&[ParamSpec::positional("param")]);
        let stream = tokens(&["--help"]);
        assert_eq!(claim(&stream, &rules, |_| false), 1);
    }
}
