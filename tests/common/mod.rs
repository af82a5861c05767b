//! Shared helpers for integration tests

#![allow(dead_code)]

use decli::prelude::*;
use std::sync::{Arc, Mutex};

/// Collects output lines from handlers and wrappers, in call order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// All lines joined with newlines, like captured stdout.
    pub fn output(&self) -> String {
        self.lines().join("\n")
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }
}

/// Command with one required positional that records "`prefix` `value`".
pub fn printing(ident: &str, param: &str, prefix: &str, out: &Recorder) -> CommandSpec {
    let out = out.clone();
    let param_name = param.to_string();
    let prefix = prefix.to_string();
    CommandSpec::new(ident)
        .param(ParamSpec::positional(param))
        .handler(move |args| {
            let value = args.get(&param_name).cloned().unwrap_or(Value::None);
            out.push(format!("{}{}", prefix, value));
            Ok(())
        })
}

/// Wrapper recording "before"/"after" around a run.
pub fn bracket(out: &Recorder) -> WrapperSpec {
    let out = out.clone();
    WrapperSpec::new("my_wrapper").on_start(move |_| {
        out.push("before");
        let out = out.clone();
        Ok(Teardown::sync(move || {
            out.push("after");
            Ok(())
        }))
    })
}

/// Render the error the way the process would print it.
pub fn rendered(err: &CliError) -> String {
    match err {
        CliError::Parse(e) => e.render().to_string(),
        other => other.to_string(),
    }
}

pub fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}
