//! End-to-end precedence tests: command line > environment > config file >
//! default, plus list merge policies and config-path resolution.

use std::io::Write;

use millefeuille::{
    builder, Driver, MergePolicy, MockEnv, ParamSpec, ParamValue, Schema, ValueKind,
};
use tempfile::NamedTempFile;

fn schema() -> Schema {
    Schema::builder()
        .param(ParamSpec::new("port", ValueKind::Integer).default_value("8080"))
        .param(ParamSpec::new("host", ValueKind::String))
        .param(ParamSpec::new("debug", ValueKind::Bool).short('d'))
        .param(ParamSpec::new("config", ValueKind::String).config_path())
        .build()
        .unwrap()
}

fn temp_conf(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".conf").unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// ============================================================================
// Single-source isolation
// ============================================================================

#[test]
fn cli_only() {
    let config = builder(schema())
        .cli(|c| c.args(["--port", "9999", "-d"]))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(9999));
    assert_eq!(params.get_bool("debug"), Some(true));
    assert!(params.provenance("port").unwrap().is_cli());
}

#[test]
fn env_only() {
    let env = MockEnv::from_pairs([("APP_PORT", "7777")]);
    let config = builder(schema())
        .env(|e| e.prefix("APP").source(env))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(7777));
    assert!(params.provenance("port").unwrap().is_env());
}

#[test]
fn file_only() {
    let file = temp_conf("port = 6666\nhost = filehost\n");
    let config = builder(schema())
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(6666));
    assert_eq!(params.get_str("host"), Some("filehost"));
    assert!(params.provenance("port").unwrap().is_file());
}

#[test]
fn default_only() {
    let config = builder(schema()).build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(8080));
    assert!(params.provenance("port").unwrap().is_default());
    // No default and no source: absent, not an error (optional).
    assert!(params.get("host").is_none());
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn cli_beats_config_file() {
    let file = temp_conf("port = 6666\n");
    let config = builder(schema())
        .cli(|c| c.args(["--port", "9999"]))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(9999));
    assert!(params.provenance("port").unwrap().is_cli());
}

#[test]
fn env_beats_config_file_cli_absent() {
    // The worked example: default 8080, env PORT=9090, file port=7070,
    // nothing on the command line. Environment wins.
    let file = temp_conf("port = 7070\n");
    let env = MockEnv::from_pairs([("PORT", "9090")]);
    let config = builder(schema())
        .cli(|c| c.args::<[&str; 0], &str>([]))
        .env(|e| e.prefix("").source(env))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(9090));
    assert!(params.provenance("port").unwrap().is_env());
}

#[test]
fn cli_beats_env() {
    let env = MockEnv::from_pairs([("APP_PORT", "7777")]);
    let config = builder(schema())
        .cli(|c| c.args(["--port", "9999"]))
        .env(|e| e.prefix("APP").source(env))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(9999));
}

#[test]
fn overrides_visible_in_report() {
    let file = temp_conf("port = 6666\n");
    let env = MockEnv::from_pairs([("APP_PORT", "7777")]);
    let config = builder(schema())
        .cli(|c| c.args(["--port", "9999"]))
        .env(|e| e.prefix("APP").source(env))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let output = Driver::new(config).run().into_result().unwrap();

    // file lost to env, env lost to cli (and the default lost to the file).
    assert!(output.report.overrides.len() >= 2);
    assert!(output
        .report
        .overrides
        .iter()
        .any(|o| o.winner.is_cli() && o.loser.is_env()));
}

// ============================================================================
// Round-trip
// ============================================================================

#[test]
fn file_round_trip() {
    let file = temp_conf("host = written-value\n");
    let config = builder(schema())
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_str("host"), Some("written-value"));
}

#[test]
fn toml_file_round_trip() {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    write!(file, "port = 4242\nhost = \"toml-host\"\n").unwrap();

    let config = builder(schema())
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_int("port"), Some(4242));
    assert_eq!(params.get_str("host"), Some("toml-host"));
}

// ============================================================================
// Config-path parameter
// ============================================================================

#[test]
fn config_path_from_cli_flag() {
    let file = temp_conf("host = pointed-at\n");
    let config = builder(schema())
        .cli(|c| c.args(["--config", file.path().to_str().unwrap()]))
        .file(|f| f)
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_str("host"), Some("pointed-at"));
}

#[test]
fn config_path_from_env_var() {
    let file = temp_conf("host = env-pointed\n");
    let env = MockEnv::from_pairs([("APP_CONFIG", file.path().to_str().unwrap())]);
    let config = builder(schema())
        .env(|e| e.prefix("APP").source(env))
        .file(|f| f)
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(params.get_str("host"), Some("env-pointed"));
}

#[test]
fn default_search_paths_pick_first_existing() {
    let file = temp_conf("host = from-default-path\n");
    let config = builder(schema())
        .file(|f| {
            f.default_paths([
                "/nonexistent/one.conf".to_string(),
                file.path().to_str().unwrap().to_string(),
            ])
        })
        .build();

    let output = Driver::new(config).run().into_result().unwrap();

    assert_eq!(output.params.get_str("host"), Some("from-default-path"));
    assert!(output.report.file_resolution.unwrap().picked().is_some());
}

// ============================================================================
// List merge policies
// ============================================================================

fn list_schema(policy: MergePolicy) -> Schema {
    Schema::builder()
        .param(ParamSpec::list("plugins", ValueKind::String).merge(policy))
        .build()
        .unwrap()
}

fn string_list(params: &millefeuille::ResolvedParams, name: &str) -> Vec<String> {
    params
        .get_list(name)
        .unwrap()
        .iter()
        .map(|v| match v {
            ParamValue::String(s) => s.clone(),
            other => panic!("expected string element, got {:?}", other),
        })
        .collect()
}

#[test]
fn append_policy_collects_all_sources() {
    let file = temp_conf("plugins = [alpha, beta]\n");
    let env = MockEnv::from_pairs([("APP_PLUGINS", "gamma")]);
    let config = builder(list_schema(MergePolicy::Append))
        .cli(|c| c.args(["--plugins", "delta"]))
        .env(|e| e.prefix("APP").source(env))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(
        string_list(&params, "plugins"),
        vec!["alpha", "beta", "gamma", "delta"]
    );
}

#[test]
fn replace_policy_keeps_highest_source_only() {
    let file = temp_conf("plugins = [alpha, beta]\n");
    let config = builder(list_schema(MergePolicy::Replace))
        .cli(|c| c.args(["--plugins", "delta"]))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(string_list(&params, "plugins"), vec!["delta"]);
}

#[test]
fn repeated_cli_flag_accumulates_within_layer() {
    let config = builder(list_schema(MergePolicy::Replace))
        .cli(|c| c.args(["--plugins", "a", "--plugins", "b"]))
        .build();

    let params = Driver::new(config).run().into_result().unwrap().get_silent();

    assert_eq!(string_list(&params, "plugins"), vec!["a", "b"]);
}

// ============================================================================
// Simultaneous sources are normal
// ============================================================================

#[test]
fn same_param_everywhere_is_not_an_error() {
    let file = temp_conf("port = 1\n");
    let env = MockEnv::from_pairs([("APP_PORT", "2")]);
    let config = builder(schema())
        .cli(|c| c.args(["--port", "3"]))
        .env(|e| e.prefix("APP").source(env))
        .file(|f| f.path(file.path().to_str().unwrap()))
        .build();

    let output = Driver::new(config).run().into_result().unwrap();

    assert!(output.report.diagnostics.is_empty());
    assert_eq!(output.params.get_int("port"), Some(3));
}
