//! Command-line layer.
//!
//! Conventional flag syntax against the schema:
//!
//! - `--flag value` and `--flag=value`
//! - short flags `-p value`, `-p=value`, clustered booleans `-vq`
//! - boolean flags take no value (`--verbose`), but accept an inline one
//!   (`--verbose=false`)
//! - `--` switches to positional-only mode
//! - positionals fill declared positional parameters in order; a repeated
//!   positional collects everything that follows
//!
//! Values stay raw strings; conversion to the declared kind is the
//! driver's job. Unknown arguments are recorded as unused keys, and become
//! errors in strict mode (the `parse_args` vs `parse_known_args`
//! distinction expressed as a flag).

use std::string::{String, ToString};
use std::vec::Vec;

use crate::config_value::{ConfigValue, Sourced};
use crate::driver::{Diagnostic, ErrorKind, LayerOutput, Severity, UnusedKey};
use crate::provenance::Provenance;
use crate::schema::{ParamSpec, Schema, ValueKind};
use crate::span::Span;

// ============================================================================
// CliConfig
// ============================================================================

/// Configuration for CLI argument parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Raw CLI arguments (without the program name).
    args: Vec<String>,
    /// Whether to error on unknown arguments.
    strict: bool,
}

impl CliConfig {
    /// Get the CLI arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Check if strict mode is enabled.
    pub fn strict(&self) -> bool {
        self.strict
    }
}

/// Builder for CLI configuration.
#[derive(Debug, Default)]
pub struct CliConfigBuilder {
    config: CliConfig,
}

impl CliConfigBuilder {
    /// Create a new CLI config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CLI arguments to parse.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set CLI arguments from an OsString iterator (e.g.
    /// `std::env::args_os().skip(1)`).
    pub fn args_os<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.config.args = args
            .into_iter()
            .filter_map(|s| s.as_ref().to_str().map(|s| s.to_string()))
            .collect();
        self
    }

    /// Enable strict mode - error on unknown arguments.
    pub fn strict(mut self) -> Self {
        self.config.strict = true;
        self
    }

    /// Build the CLI configuration.
    pub fn build(self) -> CliConfig {
        self.config
    }
}

/// Parse CLI arguments against the schema, returning a LayerOutput.
pub fn parse_cli(schema: &Schema, cli_config: &CliConfig) -> LayerOutput {
    let args: Vec<&str> = cli_config.args().iter().map(|s| s.as_str()).collect();
    let mut ctx = ParseContext::new(&args, schema, cli_config.strict());
    ctx.parse();
    ctx.into_output()
}

/// Parser context holding state during CLI parsing.
struct ParseContext<'a> {
    /// Input arguments.
    args: &'a [&'a str],
    /// Current position in args.
    index: usize,
    /// Schema being parsed against.
    schema: &'a Schema,
    /// Whether unknown arguments are errors.
    strict: bool,
    /// Output being built.
    output: LayerOutput,
    /// Whether we've seen `--` (positional-only mode).
    positional_only: bool,
    /// Positional specs in declaration order.
    positionals: Vec<&'a ParamSpec>,
    /// Index of the next positional to fill.
    positional_index: usize,
    /// Byte offset where each argument starts in the flattened string
    /// (args joined by spaces), for diagnostics.
    arg_offsets: Vec<usize>,
}

impl<'a> ParseContext<'a> {
    fn new(args: &'a [&'a str], schema: &'a Schema, strict: bool) -> Self {
        let mut arg_offsets = Vec::with_capacity(args.len());
        let mut offset = 0;
        for (i, arg) in args.iter().enumerate() {
            arg_offsets.push(offset);
            offset += arg.len();
            if i < args.len() - 1 {
                offset += 1; // space separator
            }
        }

        Self {
            args,
            index: 0,
            schema,
            strict,
            output: LayerOutput::default(),
            positional_only: false,
            positionals: schema.positionals().collect(),
            positional_index: 0,
            arg_offsets,
        }
    }

    fn span_for_arg(&self, arg_index: usize) -> Span {
        let offset = self.arg_offsets.get(arg_index).copied().unwrap_or(0);
        let len = self.args.get(arg_index).map(|s| s.len()).unwrap_or(0);
        Span::new(offset, len)
    }

    fn current_span(&self) -> Span {
        self.span_for_arg(self.index)
    }

    fn parse(&mut self) {
        while self.index < self.args.len() {
            let arg = self.args[self.index];

            if arg == "--" && !self.positional_only {
                self.positional_only = true;
                self.index += 1;
                continue;
            }

            if !self.positional_only && arg.starts_with("--") {
                self.parse_long_flag(arg);
            } else if !self.positional_only && arg.starts_with('-') && arg.len() > 1 {
                self.parse_short_flag(arg);
            } else {
                self.parse_positional(arg);
            }
        }
    }

    fn parse_long_flag(&mut self, arg: &'a str) {
        let flag = &arg[2..];

        // Reject flags that start with yet another dash (e.g. ---verbose).
        if flag.starts_with('-') {
            self.unknown_argument(arg);
            self.index += 1;
            return;
        }

        // `--flag=value` syntax.
        let (flag_name, inline_value) = match flag.find('=') {
            Some(eq_pos) => (&flag[..eq_pos], Some(&flag[eq_pos + 1..])),
            None => (flag, None),
        };

        match self.schema.find_long(flag_name) {
            Some(spec) => self.consume_flag_value(spec, format!("--{flag_name}"), inline_value),
            None => {
                self.unknown_argument(&format!("--{flag_name}"));
                self.index += 1;
            }
        }
    }

    fn parse_short_flag(&mut self, arg: &'a str) {
        let flag_part = &arg[1..];

        // `-p=value` syntax (single short flag with equals).
        if let Some(eq_pos) = flag_part.find('=') {
            if eq_pos == 1 {
                let ch = flag_part.chars().next().unwrap();
                let value = &flag_part[eq_pos + 1..];
                match self.schema.find_short(ch) {
                    Some(spec) => self.consume_flag_value(spec, format!("-{ch}"), Some(value)),
                    None => {
                        self.unknown_argument(&format!("-{ch}"));
                        self.index += 1;
                    }
                }
            } else {
                self.unknown_argument(arg);
                self.index += 1;
            }
            return;
        }

        let chars: Vec<char> = flag_part.chars().collect();

        for (i, ch) in chars.iter().enumerate() {
            let Some(spec) = self.schema.find_short(*ch) else {
                self.unknown_argument(&format!("-{ch}"));
                continue;
            };

            let is_bool = spec.kind() == ValueKind::Bool && !spec.is_repeated();
            if is_bool {
                let provenance = Provenance::cli(format!("-{ch}"), "true");
                let value = ConfigValue::Bool(Sourced {
                    value: true,
                    span: Some(self.current_span()),
                    provenance: Some(provenance),
                });
                self.insert(spec, value);
                continue;
            }

            // A value-taking short flag must be last in a cluster.
            if i != chars.len() - 1 {
                self.emit_error(
                    ErrorKind::InvalidValue,
                    format!("flag -{ch} requires a value and must be last in a group"),
                );
                continue;
            }

            self.index += 1;
            let Some(value) = self.args.get(self.index) else {
                self.emit_error(ErrorKind::InvalidValue, format!("flag -{ch} requires a value"));
                break;
            };
            let span = self.current_span();
            self.insert_string(spec, format!("-{ch}"), value, span);
        }

        self.index += 1;
    }

    /// Consume the value of a named flag found at the current index.
    fn consume_flag_value(
        &mut self,
        spec: &'a ParamSpec,
        flag_display: String,
        inline_value: Option<&str>,
    ) {
        let is_bool = spec.kind() == ValueKind::Bool && !spec.is_repeated();

        if let Some(value) = inline_value {
            let span = self.current_span();
            self.insert_string(spec, flag_display, value, span);
            self.index += 1;
            return;
        }

        if is_bool {
            // Presence alone means true.
            let provenance = Provenance::cli(flag_display, "true");
            let value = ConfigValue::Bool(Sourced {
                value: true,
                span: Some(self.current_span()),
                provenance: Some(provenance),
            });
            self.insert(spec, value);
            self.index += 1;
            return;
        }

        self.index += 1;
        let Some(value) = self.args.get(self.index) else {
            self.emit_error(
                ErrorKind::InvalidValue,
                format!("flag {flag_display} requires a value"),
            );
            return;
        };
        let span = self.current_span();
        self.insert_string(spec, flag_display, value, span);
        self.index += 1;
    }

    fn parse_positional(&mut self, arg: &'a str) {
        match self.positionals.get(self.positional_index).copied() {
            Some(spec) => {
                let display = format!("<{}>", spec.long_flag());
                let span = self.current_span();
                self.insert_string(spec, display, arg, span);
                if !spec.is_repeated() {
                    self.positional_index += 1;
                }
            }
            None => {
                self.output.unused_keys.push(UnusedKey {
                    key: arg.to_string(),
                    provenance: Provenance::cli(arg, ""),
                });
                if self.strict {
                    self.output.diagnostics.push(Diagnostic {
                        kind: Some(ErrorKind::UnknownArgument),
                        message: format!("unexpected positional argument: {arg}"),
                        span: Some(self.current_span()),
                        provenance: Some(Provenance::cli(arg, "")),
                        severity: Severity::Error,
                    });
                }
            }
        }
        self.index += 1;
    }

    fn insert_string(&mut self, spec: &'a ParamSpec, display: String, value: &str, span: Span) {
        let provenance = Provenance::cli(display, value);
        let candidate = ConfigValue::String(Sourced {
            value: value.to_string(),
            span: Some(span),
            provenance: Some(provenance),
        });
        self.insert(spec, candidate);
    }

    /// Insert a candidate; repeated parameters accumulate, scalars let the
    /// last occurrence win.
    fn insert(&mut self, spec: &'a ParamSpec, value: ConfigValue) {
        if spec.is_repeated() {
            let provenance = value.provenance().cloned();
            let entry = self
                .output
                .values
                .entry(spec.name().to_string())
                .or_insert_with(|| {
                    let mut sourced = Sourced::new(Vec::new());
                    sourced.provenance = provenance;
                    ConfigValue::Array(sourced)
                });
            if let ConfigValue::Array(arr) = entry {
                arr.value.push(value);
            }
        } else {
            self.output.values.insert(spec.name().to_string(), value);
        }
    }

    fn unknown_argument(&mut self, display: &str) {
        self.output.unused_keys.push(UnusedKey {
            key: display.to_string(),
            provenance: Provenance::cli(display, ""),
        });
        if self.strict {
            self.output.diagnostics.push(Diagnostic {
                kind: Some(ErrorKind::UnknownArgument),
                message: format!("unknown argument: {display}"),
                span: Some(self.current_span()),
                provenance: Some(Provenance::cli(display, "")),
                severity: Severity::Error,
            });
        }
    }

    fn emit_error(&mut self, kind: ErrorKind, message: String) {
        self.output.diagnostics.push(Diagnostic {
            kind: Some(kind),
            message,
            span: Some(self.current_span()),
            provenance: Some(Provenance::cli(self.args.get(self.index).copied().unwrap_or(""), "")),
            severity: Severity::Error,
        });
    }

    fn into_output(self) -> LayerOutput {
        self.output
    }
}
