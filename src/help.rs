//! Help text generation from the schema.
//!
//! Produces the usual USAGE / ARGUMENTS / OPTIONS sections, annotates each
//! option with the environment variable and default that can feed it, and
//! closes with a paragraph explaining config-file support and the
//! precedence chain.

use std::string::String;
use std::vec::Vec;

use heck::ToShoutySnakeCase;
use owo_colors::OwoColorize;

use crate::schema::{ParamSpec, Schema, ValueKind};

/// Configuration for help text generation.
#[derive(Debug, Clone)]
pub struct HelpConfig {
    /// Program name (defaults to the executable name).
    pub program_name: Option<String>,
    /// Program version.
    pub version: Option<String>,
    /// Additional description shown under the program name.
    pub description: Option<String>,
    /// Width for wrapping text (0 = no wrapping).
    pub width: usize,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            program_name: None,
            version: None,
            description: None,
            width: 80,
        }
    }
}

impl HelpConfig {
    /// The program name, falling back to the executable name.
    pub(crate) fn resolved_program_name(&self) -> String {
        self.program_name
            .clone()
            .or_else(|| std::env::args().next())
            .unwrap_or_else(|| "program".to_string())
    }
}

/// Generate help text for a schema.
///
/// `env_prefix` is the configured environment prefix, used to show the
/// derived variable name next to each option.
pub fn generate_help(schema: &Schema, config: &HelpConfig, env_prefix: Option<&str>) -> String {
    let mut out = String::new();
    let program_name = config.resolved_program_name();

    if let Some(version) = &config.version {
        out.push_str(&format!("{program_name} {version}\n"));
    } else {
        out.push_str(&format!("{program_name}\n"));
    }

    if let Some(desc) = &config.description {
        out.push('\n');
        out.push_str(desc);
        out.push('\n');
    }

    out.push('\n');

    let positionals: Vec<&ParamSpec> = schema.positionals().collect();
    let named: Vec<&ParamSpec> = schema.named().collect();

    // Usage line
    out.push_str(&format!("{}:\n    ", "USAGE".yellow().bold()));
    out.push_str(&program_name);
    if !named.is_empty() {
        out.push_str(" [OPTIONS]");
    }
    for pos in &positionals {
        let placeholder = pos.name().to_shouty_snake_case();
        match (pos.is_required(), pos.is_repeated()) {
            (true, false) => out.push_str(&format!(" <{placeholder}>")),
            (true, true) => out.push_str(&format!(" <{placeholder}>...")),
            (false, false) => out.push_str(&format!(" [{placeholder}]")),
            (false, true) => out.push_str(&format!(" [{placeholder}]...")),
        }
    }
    out.push_str("\n\n");

    // Positional arguments
    if !positionals.is_empty() {
        out.push_str(&format!("{}:\n", "ARGUMENTS".yellow().bold()));
        for spec in &positionals {
            let left = format!("<{}>", spec.name().to_shouty_snake_case());
            write_entry(&mut out, &left, spec, None, config.width);
        }
        out.push('\n');
    }

    // Options
    if !named.is_empty() {
        out.push_str(&format!("{}:\n", "OPTIONS".yellow().bold()));
        for spec in &named {
            let mut left = String::new();
            match spec.short_flag() {
                Some(short) => left.push_str(&format!("-{short}, ")),
                None => left.push_str("    "),
            }
            left.push_str(&format!("--{}", spec.long_flag()));
            if spec.kind() != ValueKind::Bool || spec.is_repeated() {
                left.push_str(&format!(" <{}>", spec.name().to_shouty_snake_case()));
            }
            write_entry(&mut out, &left, spec, env_prefix, config.width);
        }
        out.push('\n');
    }

    if let Some(epilogue) = config_file_epilogue(schema) {
        for line in wrap_text(&epilogue, config.width) {
            out.push_str(&line);
            out.push('\n');
        }
    }

    out
}

/// Write one argument/option entry: the flag column, the help text, and the
/// env-var/default annotations.
fn write_entry(
    out: &mut String,
    left: &str,
    spec: &ParamSpec,
    env_prefix: Option<&str>,
    width: usize,
) {
    let mut right = spec.help_text().unwrap_or("").to_string();

    if !spec.is_positional() && !spec.is_builtin() {
        let env_name = if spec.env_aliases().is_empty() {
            env_prefix.map(|prefix| spec.derived_env_var(prefix))
        } else {
            Some(spec.env_aliases().join(", "))
        };
        if let Some(env_name) = env_name {
            right.push_str(&format!(" [env var: {env_name}]"));
        }
    }
    if let Some(default) = spec.default_raw() {
        right.push_str(&format!(" [default: {default}]"));
    }

    let right = right.trim().to_string();
    if right.is_empty() {
        out.push_str(&format!("    {left}\n"));
        return;
    }

    // Long flag columns push the help text onto its own line.
    if left.len() > 26 {
        out.push_str(&format!("    {left}\n"));
        for line in wrap_text(&right, width.saturating_sub(12)) {
            out.push_str(&format!("            {line}\n"));
        }
    } else {
        let mut lines = wrap_text(&right, width.saturating_sub(32)).into_iter();
        let first = lines.next().unwrap_or_default();
        out.push_str(&format!("    {left:<26}  {first}\n"));
        for line in lines {
            out.push_str(&format!("    {:<26}  {line}\n", ""));
        }
    }
}

/// The trailing paragraph describing config-file support and precedence.
fn config_file_epilogue(schema: &Schema) -> Option<String> {
    let config_param = schema.config_path_param()?;
    Some(format!(
        "Options can also be set in a config file (key=value or TOML), \
         specified via --{}. If an option is given in more than one place, \
         command-line values override environment variables, which override \
         config file values, which override defaults.",
        config_param.long_flag()
    ))
}

/// Greedy word wrap. A width of 0 disables wrapping.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(core::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;

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

    fn help() -> String {
        let config = HelpConfig {
            program_name: Some("testapp".into()),
            version: Some("1.2.3".into()),
            description: Some("A test application".into()),
            width: 80,
        };
        generate_help(&schema(), &config, Some("APP"))
    }

    #[test]
    fn test_header_has_name_and_version() {
        let text = help();
        assert!(text.starts_with("testapp 1.2.3\n"));
        assert!(text.contains("A test application"));
    }

    #[test]
    fn test_usage_line() {
        let text = help();
        assert!(text.contains("testapp [OPTIONS] <INPUT>"));
    }

    #[test]
    fn test_options_listed() {
        let text = help();
        assert!(text.contains("-p, --port <PORT>"));
        assert!(text.contains("--database-url <DATABASE_URL>"));
        assert!(text.contains("-h, --help"));
        assert!(text.contains("-V, --version"));
    }

    #[test]
    fn test_env_var_annotations() {
        let text = help();
        // Derived name for port, explicit alias for database_url.
        assert!(text.contains("[env var: APP_PORT]"));
        assert!(text.contains("[env var: DATABASE_URL]"));
    }

    #[test]
    fn test_default_annotation() {
        let text = help();
        assert!(text.contains("[default: 8080]"));
    }

    #[test]
    fn test_config_file_epilogue() {
        let text = help();
        assert!(text.contains("--config"));
        assert!(text.contains("command-line values override environment variables"));
    }

    #[test]
    fn test_no_epilogue_without_config_param() {
        let schema = Schema::builder()
            .param(ParamSpec::new("port", ValueKind::Integer))
            .build()
            .unwrap();
        let text = generate_help(&schema, &HelpConfig::default(), None);
        assert!(!text.contains("config file"));
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let lines = wrap_text("unwrapped", 0);
        assert_eq!(lines, vec!["unwrapped"]);
    }
}
