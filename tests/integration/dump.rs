//! The provenance dump: resolved values grouped by originating source.

use std::io::Write;

use millefeuille::{builder, format_values, Driver, MockEnv, ParamSpec, Schema, ValueKind};
use tempfile::NamedTempFile;

fn schema() -> Schema {
    Schema::builder()
        .param(ParamSpec::new("port", ValueKind::Integer))
        .param(ParamSpec::new("host", ValueKind::String))
        .param(ParamSpec::new("timeout", ValueKind::Integer))
        .param(ParamSpec::new("retries", ValueKind::Integer).default_value("3"))
        .build()
        .unwrap()
}

#[test]
fn dump_groups_values_by_source() {
    let mut file = NamedTempFile::with_suffix(".conf").unwrap();
    write!(file, "timeout = 30\n").unwrap();

    let env = MockEnv::from_pairs([("APP_HOST", "example.com")]);
    let config = builder(schema())
        .cli(|c| c.args(["--port", "8080"]))
        .env(|e| e.prefix("APP").source(env))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let output = Driver::new(config).run().into_result().unwrap();
    let text = format_values(&output.params, output.report.file_resolution.as_ref());

    let cli = text.find("Command Line Args:").expect("cli heading");
    let env = text.find("Environment Variables:").expect("env heading");
    let file_heading = text.find("Config File (").expect("file heading");
    let defaults = text.find("Defaults:").expect("defaults heading");

    assert!(cli < env && env < file_heading && file_heading < defaults);

    // Each value sits in the right section.
    assert!(text.contains("--port:"));
    assert!(text.contains("APP_HOST:"));
    assert!(text.contains("timeout:"));
    assert!(text.contains("retries:"));
    assert!(text.contains("8080"));
    assert!(text.contains("example.com"));
    assert!(text.contains("30"));
}

#[test]
fn dump_names_the_config_file() {
    let mut file = NamedTempFile::with_suffix(".conf").unwrap();
    write!(file, "timeout = 30\n").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let config = builder(schema()).file(|f| f.path(path.clone())).build();

    let output = Driver::new(config).run().into_result().unwrap();
    let text = format_values(&output.params, output.report.file_resolution.as_ref());

    assert!(text.contains(&format!("Config File ({path}):")));
}

#[test]
fn dump_omits_empty_sections() {
    let config = builder(schema()).cli(|c| c.args(["--port", "1"])).build();

    let output = Driver::new(config).run().into_result().unwrap();
    let text = format_values(&output.params, output.report.file_resolution.as_ref());

    assert!(text.contains("Command Line Args:"));
    assert!(!text.contains("Environment Variables:"));
    assert!(!text.contains("Config File"));
    // retries still has its default.
    assert!(text.contains("Defaults:"));
}
