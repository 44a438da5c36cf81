//! Help and version short-circuits.

use millefeuille::{builder, Driver, DriverError, ParamSpec, Schema, ValueKind};

fn schema() -> Schema {
    Schema::builder()
        .param(
            ParamSpec::new("port", ValueKind::Integer)
                .short('p')
                .default_value("8080")
                .help("Port to listen on"),
        )
        .param(
            ParamSpec::new("database_url", ValueKind::String)
                .env_var("DATABASE_URL")
                .help("Database connection string"),
        )
        .param(ParamSpec::new("config", ValueKind::String).config_path())
        .param(
            ParamSpec::new("input", ValueKind::String)
                .positional()
                .required()
                .help("Input file"),
        )
        .build()
        .unwrap()
}

fn help_text(args: &[&str]) -> String {
    let config = builder(schema())
        .cli(|c| c.args(args.iter().copied()))
        .env(|e| e.prefix("APP"))
        .help(|h| h.program_name("myapp").version("3.1.4").description("Does things"))
        .build();

    match Driver::new(config).run().into_result() {
        Err(DriverError::Help { text }) => text,
        other => panic!("expected DriverError::Help, got {:?}", other),
    }
}

#[test]
fn help_flag_short_circuits() {
    let text = help_text(&["--help"]);
    assert!(text.contains("myapp 3.1.4"));
    assert!(text.contains("Does things"));
}

#[test]
fn help_short_flag() {
    let text = help_text(&["-h"]);
    assert!(text.contains("USAGE"));
}

#[test]
fn help_lists_every_declared_flag() {
    let text = help_text(&["--help"]);
    assert!(text.contains("--port"));
    assert!(text.contains("--database-url"));
    assert!(text.contains("--config"));
    assert!(text.contains("<INPUT>"));
    assert!(text.contains("Port to listen on"));
}

#[test]
fn help_annotates_env_vars_and_defaults() {
    let text = help_text(&["--help"]);
    assert!(text.contains("[env var: APP_PORT]"));
    assert!(text.contains("[env var: DATABASE_URL]"));
    assert!(text.contains("[default: 8080]"));
}

#[test]
fn help_explains_precedence() {
    let text = help_text(&["--help"]);
    assert!(text.contains("command-line values override environment variables"));
}

#[test]
fn help_wins_even_with_missing_required() {
    // <input> is required but absent; --help still short-circuits.
    let text = help_text(&["--help"]);
    assert!(!text.is_empty());
}

#[test]
fn version_flag_short_circuits() {
    let config = builder(schema())
        .cli(|c| c.args(["--version"]))
        .help(|h| h.program_name("myapp").version("3.1.4"))
        .build();

    match Driver::new(config).run().into_result() {
        Err(DriverError::Version { text }) => {
            assert!(text.contains("myapp"));
            assert!(text.contains("3.1.4"));
        }
        other => panic!("expected DriverError::Version, got {:?}", other),
    }
}

#[test]
fn help_and_version_are_success_exits() {
    let error = {
        let config = builder(schema()).cli(|c| c.args(["--help"])).build();
        Driver::new(config).run().unwrap_err()
    };
    assert_eq!(error.exit_code(), 0);
    assert!(error.is_success());
    assert!(error.is_help());
    assert!(error.help_text().is_some());

    let error = {
        let config = builder(schema()).cli(|c| c.args(["-V"])).build();
        Driver::new(config).run().unwrap_err()
    };
    assert_eq!(error.exit_code(), 0);
    assert!(!error.is_help());
}
