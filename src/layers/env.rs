//! Environment variable layer.
//!
//! For every non-positional parameter the layer consults, in order:
//!
//! 1. the parameter's explicit environment aliases (e.g. `DATABASE_URL`);
//! 2. when no alias is declared, the variable derived from the configured
//!    prefix and the parameter name (`APP` + `log_level` → `APP_LOG_LEVEL`).
//!
//! The first variable present in the environment wins. Values stay raw
//! strings here (list parameters split on commas, with `\,` escaping);
//! conversion to the declared kind is the driver's job.
//!
//! Reads go through the [`EnvSource`] trait so tests never touch the real
//! process environment.

use std::string::{String, ToString};
use std::vec::Vec;

use indexmap::IndexMap;

use crate::config_value::{ConfigValue, Sourced};
use crate::driver::{Diagnostic, ErrorKind, LayerOutput, Severity, UnusedKey};
use crate::provenance::Provenance;
use crate::schema::Schema;

// ============================================================================
// EnvSource trait
// ============================================================================

/// Trait for abstracting over environment variable sources.
///
/// This allows testing without modifying the actual environment.
pub trait EnvSource {
    /// Get the value of an environment variable by name.
    fn get(&self, name: &str) -> Option<String>;

    /// Iterate over all environment variables.
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;
}

/// Environment source that reads from the actual process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnv;

impl EnvSource for StdEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(std::env::vars())
    }
}

/// Environment source backed by a map (for testing).
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: IndexMap<String, String>,
}

impl MockEnv {
    /// Create a new empty mock environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock environment from an iterator of key-value pairs.
    pub fn from_pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set an environment variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl EnvSource for MockEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

// ============================================================================
// EnvConfig
// ============================================================================

/// Configuration for environment variable parsing.
pub struct EnvConfig {
    /// The prefix for derived variable names (e.g. `APP` makes parameter
    /// `port` readable from `APP_PORT`). Empty means the bare upper-cased
    /// parameter name is used.
    pub prefix: String,

    /// Whether prefixed variables that match no parameter should be errors
    /// (to catch typos).
    pub strict: bool,

    /// Custom environment source (for testing). If None, uses StdEnv.
    pub source: Option<Box<dyn EnvSource>>,
}

impl EnvConfig {
    /// Create a new EnvConfig with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            strict: false,
            source: None,
        }
    }

    /// Enable strict mode.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Get the env source, or StdEnv if none set.
    pub fn source(&self) -> &dyn EnvSource {
        self.source.as_ref().map(|s| s.as_ref()).unwrap_or(&StdEnv)
    }
}

/// Builder for environment variable configuration.
#[derive(Default)]
pub struct EnvConfigBuilder {
    prefix: String,
    strict: bool,
    source: Option<Box<dyn EnvSource>>,
}

impl EnvConfigBuilder {
    /// Create a new env config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the environment variable prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable strict mode - error on prefixed variables that match nothing.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Use a custom environment source (for testing).
    pub fn source(mut self, source: impl EnvSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Build the env configuration.
    pub fn build(self) -> EnvConfig {
        let mut config = EnvConfig::new(self.prefix);
        if self.strict {
            config = config.strict();
        }
        config.source = self.source;
        config
    }
}

/// Parse environment variables against the schema, returning a LayerOutput.
pub fn parse_env(schema: &Schema, env_config: &EnvConfig, source: &dyn EnvSource) -> LayerOutput {
    let mut output = LayerOutput::default();
    let prefix = &env_config.prefix;

    for spec in schema
        .params()
        .filter(|p| !p.is_positional() && !p.is_builtin())
    {
        // Explicit aliases replace the derived name entirely.
        let candidates: Vec<String> = if spec.env_aliases().is_empty() {
            vec![spec.derived_env_var(prefix)]
        } else {
            spec.env_aliases().to_vec()
        };

        let Some((var, value)) = candidates
            .into_iter()
            .find_map(|var| source.get(&var).map(|value| (var, value)))
        else {
            continue;
        };

        let provenance = Provenance::env(&var, &value);
        let candidate = if spec.is_repeated() {
            let elements = parse_comma_separated(&value)
                .into_iter()
                .map(|e| ConfigValue::string(e, provenance.clone()))
                .collect();
            ConfigValue::Array(Sourced::with_provenance(elements, provenance))
        } else {
            ConfigValue::string(value, provenance)
        };

        output.values.insert(spec.name().to_string(), candidate);
    }

    scan_unmatched_prefixed(schema, env_config, source, &mut output);

    output
}

/// Record prefixed variables that fed no parameter, so typos are visible
/// (and fatal in strict mode).
fn scan_unmatched_prefixed(
    schema: &Schema,
    env_config: &EnvConfig,
    source: &dyn EnvSource,
    output: &mut LayerOutput,
) {
    let prefix = &env_config.prefix;
    if prefix.is_empty() {
        return;
    }
    let prefix_with_sep = format!("{}_", prefix);

    for (name, _value) in source.vars() {
        let Some(rest) = name.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        if rest.is_empty() {
            output.diagnostics.push(Diagnostic {
                kind: None,
                message: format!("invalid environment variable name: {name} (empty after prefix)"),
                span: None,
                provenance: Some(Provenance::env(&name, "")),
                severity: Severity::Warning,
            });
            continue;
        }

        let matches_some_param = schema
            .params()
            .filter(|p| !p.is_positional() && !p.is_builtin() && p.env_aliases().is_empty())
            .any(|p| p.derived_env_var(prefix) == name);

        if !matches_some_param {
            output.unused_keys.push(UnusedKey {
                key: name.clone(),
                provenance: Provenance::env(&name, ""),
            });
            if env_config.strict {
                output.diagnostics.push(Diagnostic {
                    kind: Some(ErrorKind::UnknownArgument),
                    message: format!("unknown environment variable: {name}"),
                    span: None,
                    provenance: Some(Provenance::env(&name, "")),
                    severity: Severity::Error,
                });
            }
        }
    }
}

/// Parse a comma-separated string, handling `\,` escaping.
pub(crate) fn parse_comma_separated(input: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if next == ',' {
                    chars.next();
                    current.push(',');
                } else {
                    current.push(ch);
                }
            } else {
                current.push(ch);
            }
        } else if ch == ',' {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                result.push(trimmed);
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }

    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        result.push(trimmed);
    }

    if result.is_empty() {
        result.push(input.to_string());
    }

    result
}
