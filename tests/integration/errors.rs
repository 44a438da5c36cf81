//! Error aggregation: every missing required parameter and every failed
//! conversion reported together, config file parse failures fatal.

use std::io::Write;

use millefeuille::{builder, Driver, DriverError, ErrorKind, MockEnv, ParamSpec, Schema, ValueKind};
use tempfile::NamedTempFile;

fn schema() -> Schema {
    Schema::builder()
        .param(ParamSpec::new("port", ValueKind::Integer))
        .param(ParamSpec::new("host", ValueKind::String).required())
        .param(ParamSpec::new("api_key", ValueKind::String).required())
        .param(ParamSpec::new("ratio", ValueKind::Float))
        .build()
        .unwrap()
}

fn temp_conf(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".conf").unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn missing_required_names_the_parameter() {
    let config = builder(schema())
        .cli(|c| c.args(["--port", "1", "--host", "x", "--api-key", "k"]))
        .build();
    assert!(Driver::new(config).run().is_ok());

    let config = builder(schema()).cli(|c| c.args(["--port", "1"])).build();
    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    let missing = report.errors_of_kind(ErrorKind::MissingRequired);
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().any(|d| d.message.contains("'host'")));
    assert!(missing.iter().any(|d| d.message.contains("'api_key'")));
}

#[test]
fn all_errors_reported_in_one_pass() {
    // Two bad conversions and two missing required parameters: four errors,
    // one report.
    let env = MockEnv::from_pairs([("APP_RATIO", "not-a-float")]);
    let config = builder(schema())
        .cli(|c| c.args(["--port", "not-a-number"]))
        .env(|e| e.prefix("APP").source(env))
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    assert_eq!(report.errors_of_kind(ErrorKind::TypeConversion).len(), 2);
    assert_eq!(report.errors_of_kind(ErrorKind::MissingRequired).len(), 2);
}

#[test]
fn conversion_error_references_config_file_source() {
    let file = temp_conf("port = not-a-number\nhost = x\napi_key = k\n");
    let path = file.path().to_str().unwrap().to_string();
    let config = builder(schema()).file(|f| f.path(path.clone())).build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    let conversions = report.errors_of_kind(ErrorKind::TypeConversion);
    assert_eq!(conversions.len(), 1);
    let diag = conversions[0];
    assert!(diag.message.contains("'port'"));
    assert!(diag.message.contains("not-a-number"));
    assert!(diag.message.contains(&path), "message should name the file");
    assert!(diag.provenance.as_ref().unwrap().is_file());
}

#[test]
fn conversion_error_references_env_source() {
    let env = MockEnv::from_pairs([
        ("APP_PORT", "abc"),
        ("APP_HOST", "x"),
        ("APP_API_KEY", "k"),
    ]);
    let config = builder(schema()).env(|e| e.prefix("APP").source(env)).build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    let conversions = report.errors_of_kind(ErrorKind::TypeConversion);
    assert_eq!(conversions.len(), 1);
    assert!(conversions[0].message.contains("APP_PORT"));
}

#[test]
fn config_file_parse_failure_is_fatal() {
    let file = temp_conf("port = 1\n=== what is this ===\n");
    let config = builder(schema())
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    assert!(!report.errors_of_kind(ErrorKind::ConfigFileParse).is_empty());
}

#[test]
fn explicit_config_file_missing_is_fatal() {
    let config = builder(schema())
        .file(|f| f.path("/nonexistent/app.conf"))
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    let errors = report.errors_of_kind(ErrorKind::ConfigFileParse);
    assert!(errors.iter().any(|d| d.message.contains("not found")));
}

#[test]
fn absent_default_paths_are_not_an_error() {
    let config = builder(schema())
        .cli(|c| c.args(["--host", "x", "--api-key", "k"]))
        .file(|f| f.default_paths(["/nonexistent/app.conf"]))
        .build();

    assert!(Driver::new(config).run().is_ok());
}

#[test]
fn unknown_cli_argument_tolerated_by_default() {
    let config = builder(schema())
        .cli(|c| c.args(["--host", "x", "--api-key", "k", "--mystery", "1"]))
        .build();

    let output = Driver::new(config).run().into_result().unwrap();
    assert!(output
        .report
        .layers
        .cli
        .unused_keys
        .iter()
        .any(|k| k.key == "--mystery"));
}

#[test]
fn unknown_cli_argument_is_error_in_strict_mode() {
    let config = builder(schema())
        .cli(|c| c.args(["--host", "x", "--api-key", "k", "--mystery"]).strict())
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    let unknown = report.errors_of_kind(ErrorKind::UnknownArgument);
    assert!(unknown.iter().any(|d| d.message.contains("--mystery")));
}

#[test]
fn unknown_file_key_is_error_in_strict_mode() {
    let file = temp_conf("host = x\napi_key = k\nmystery = 1\n");
    let config = builder(schema())
        .file(|f| f.path(file.path().to_str().unwrap()).strict())
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    assert!(report
        .errors_of_kind(ErrorKind::UnknownArgument)
        .iter()
        .any(|d| d.message.contains("mystery")));
}

#[test]
fn flag_without_value_is_invalid() {
    let config = builder(schema())
        .cli(|c| c.args(["--host", "x", "--api-key", "k", "--port"]))
        .build();

    let error = Driver::new(config).run().unwrap_err();
    let report = error.report().unwrap();

    assert!(!report.errors_of_kind(ErrorKind::InvalidValue).is_empty());
}

#[test]
fn failed_error_renders_all_diagnostics() {
    let config = builder(schema()).cli(|c| c.args(["--port", "zzz"])).build();

    let error = Driver::new(config).run().unwrap_err();
    assert!(matches!(error, DriverError::Failed { .. }));
    assert_eq!(error.exit_code(), 1);

    let rendered = error.to_string();
    assert!(rendered.contains("zzz"));
    assert!(rendered.contains("host"));
    assert!(rendered.contains("api_key"));
}
