//! Config-file driven apps: metadata and global options from TOML/JSON

mod common;

use clap::error::ErrorKind;
use common::{rendered, Recorder};
use decli::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const TOML_CONFIG: &str = r#"
name = "deploy"
version = "2.0.1"
about = "Deploy things"

[[globals]]
name = "host"
default = "example.org"
help = "target host"

[[globals]]
name = "retries"
default = 3
choices = [1, 3, 5]
"#;

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn connect(out: &Recorder) -> CommandSpec {
    let out = out.clone();
    CommandSpec::new("connect")
        .param(ParamSpec::keyword("host", Value::None))
        .param(ParamSpec::keyword("retries", 1))
        .handler(move |args| {
            out.push(format!(
                "{} x{}",
                args.value::<String>("host")?,
                args.value::<i64>("retries")?
            ));
            Ok(())
        })
}

#[test]
fn test_globals_from_toml_file() {
    let file = write_config(".toml", TOML_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.name, "deploy");

    let out = Recorder::new();
    let mut app = App::from_config(config).unwrap();
    app.register(connect(&out)).unwrap();

    app.try_run_from(["connect"]).unwrap();
    app.try_run_from(["connect", "--host", "prod.org", "-r", "5"])
        .unwrap();
    assert_eq!(out.lines(), vec!["example.org x3", "prod.org x5"]);

    let err = app.try_run_from(["connect", "-r", "4"]).unwrap_err();
    assert!(rendered(&err).contains("invalid choice: 4 (choose from 1, 3, 5)"));
}

#[test]
fn test_metadata_reaches_top_level_parser() {
    let file = write_config(".toml", TOML_CONFIG);
    let mut app = App::from_config(AppConfig::from_toml_file(file.path()).unwrap()).unwrap();
    app.register(connect(&Recorder::new())).unwrap();

    let err = app.try_run_from(["--version"]).unwrap_err();
    assert_eq!(err.parse_kind(), Some(ErrorKind::DisplayVersion));
    assert!(rendered(&err).contains("2.0.1"));

    let err = app.try_run_from(["--help"]).unwrap_err();
    let help = rendered(&err);
    assert!(help.contains("Deploy things"));
    assert!(help.contains("target host"));
}

#[test]
fn test_globals_from_json_file() {
    let json = r#"{
        "name": "deploy",
        "globals": [{"name": "host", "default": "json.org"}]
    }"#;
    let file = write_config(".json", json);
    let out = Recorder::new();
    let mut app = App::from_config(AppConfig::from_file(file.path()).unwrap()).unwrap();
    app.register(connect(&out)).unwrap();

    app.try_run_from(["connect"]).unwrap();
    assert_eq!(out.lines(), vec!["json.org x1"]);
}

#[test]
fn test_unknown_extension_tries_toml_then_json() {
    let file = write_config(".conf", r#"{"name": "fallback"}"#);
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.name, "fallback");
}

#[test]
fn test_missing_file_is_a_config_error() {
    let err = AppConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, CliError::ConfigError(_)));
    assert!(err.to_string().contains("/definitely/not/here.toml"));
}

#[test]
fn test_malformed_file_error_names_the_file() {
    let file = write_config(".json", "{ not json");
    let err = AppConfig::from_file(file.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&file.path().display().to_string()));
    assert!(message.contains("invalid JSON app config"));
}

#[test]
fn test_duplicate_global_in_config_rejected() {
    let toml = r#"
name = "dup"

[[globals]]
name = "host"

[[globals]]
name = "host"
"#;
    let file = write_config(".toml", toml);
    let err = App::from_config(AppConfig::from_file(file.path()).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        CliError::Registration(RegistrationError::DuplicateGlobal(_))
    ));
}
