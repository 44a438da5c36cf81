//! Driver orchestrating layered resolution, validation, and diagnostics.
//!
//! # Phases
//! 1. **Parse layers**: environment and CLI first, then the file layer
//!    (the config-path parameter may name the file to load)
//! 2. **Check special flags**: if help/version was requested, short-circuit
//! 3. **Merge** layers by priority (CLI > env > file > defaults)
//! 4. **Convert** winning candidates to their declared kinds, accumulating
//!    every conversion failure and missing required parameter
//! 5. Fail with all errors together, or produce the resolved set
//!
//! A config file that fails to parse is fatal immediately; everything else
//! is collected so one run reports every problem at once.

use std::string::String;
use std::vec::Vec;

use indexmap::IndexMap;

use crate::builder::Config;
use crate::config_value::ConfigValue;
use crate::convert::convert_params;
use crate::help::generate_help;
use crate::layers::env::parse_comma_separated;
use crate::layers::{cli::parse_cli, env::parse_env, file::parse_file};
use crate::merge::merge_layers;
use crate::provenance::{FileResolution, Override, Provenance};
use crate::resolved::ResolvedParams;
use crate::span::Span;

/// Output of a single layer: candidates, unused keys, and diagnostics.
#[derive(Debug, Default)]
pub struct LayerOutput {
    /// Candidates keyed by canonical parameter name.
    pub values: IndexMap<String, ConfigValue>,
    /// Keys provided by this layer that fed no parameter.
    pub unused_keys: Vec<UnusedKey>,
    /// Layer-specific diagnostics collected while parsing.
    pub diagnostics: Vec<Diagnostic>,
}

/// A key that fed no parameter, with provenance.
#[derive(Debug)]
pub struct UnusedKey {
    /// The unused key (flag, variable, or file key).
    pub key: String,
    /// Where it came from.
    pub provenance: Provenance,
}

/// Layered candidates from defaults/file/env/CLI, with diagnostics.
#[derive(Debug, Default)]
pub struct ConfigLayers {
    /// Default layer (lowest priority).
    pub defaults: LayerOutput,
    /// File layer.
    pub file: LayerOutput,
    /// Environment layer.
    pub env: LayerOutput,
    /// CLI layer (highest priority).
    pub cli: LayerOutput,
}

/// The error kinds a resolution can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required parameter had no candidate from any source.
    MissingRequired,
    /// A candidate failed conversion to the declared kind.
    TypeConversion,
    /// The config file could not be found, read, or parsed (fatal).
    ConfigFileParse,
    /// An argument or key matched no parameter (strict mode).
    UnknownArgument,
    /// Malformed command-line usage, e.g. a flag missing its value.
    InvalidValue,
}

/// A diagnostic message produced during resolution.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The error kind, when this diagnostic is one of the declared kinds.
    pub kind: Option<ErrorKind>,
    /// Human-readable message.
    pub message: String,
    /// Optional byte span within the originating source.
    pub span: Option<Span>,
    /// Provenance of the offending value, used to pick the source text the
    /// span points into.
    pub provenance: Option<Provenance>,
    /// Diagnostic severity.
    pub severity: Severity,
}

/// Severity for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error that prevents producing a resolved set.
    Error,
    /// Warning that allows resolution to proceed.
    Warning,
    /// Informational note.
    Note,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

/// Driver that executes the resolution pipeline for a [`Config`].
pub struct Driver {
    config: Config,
}

impl Driver {
    /// Create a driver from a fully built config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute the driver and return an outcome.
    ///
    /// The returned `DriverOutcome` must be handled explicitly:
    /// - Use `.unwrap()` for automatic exit handling (recommended)
    /// - Use `.into_result()` if you need manual control
    pub fn run(self) -> DriverOutcome {
        let Config {
            schema,
            cli_config,
            help_config,
            env_config,
            file_config,
        } = self.config;

        let mut layers = ConfigLayers::default();
        let mut file_resolution = None;

        // Source text for rendering CLI spans.
        let cli_args_source = cli_config
            .as_ref()
            .map(|c| {
                let args = c.args().join(" ");
                if args.is_empty() {
                    "<no arguments>".to_string()
                } else {
                    args
                }
            })
            .unwrap_or_else(|| "<no arguments>".to_string());

        // Phase 1a: environment layer.
        if let Some(ref env_config) = env_config {
            layers.env = parse_env(&schema, env_config, env_config.source());
            tracing::debug!(count = layers.env.values.len(), "driver: parsed env layer");
        }

        // Phase 1b: CLI layer.
        if let Some(ref cli_config) = cli_config {
            layers.cli = parse_cli(&schema, cli_config);
            tracing::debug!(count = layers.cli.values.len(), "driver: parsed CLI layer");
        }

        // Phase 2: help/version short-circuit, before any validation.
        if schema.auto_help() {
            let help_config = help_config.clone().unwrap_or_default();
            if flag_requested(&layers.cli, "help") {
                let env_prefix = env_config.as_ref().map(|e| e.prefix.as_str());
                let text = generate_help(&schema, &help_config, env_prefix);
                return DriverOutcome::err(DriverError::Help { text });
            }
            if flag_requested(&layers.cli, "version") {
                let version = help_config.version.clone().unwrap_or_else(|| "unknown".into());
                let text = format!("{} {}", help_config.resolved_program_name(), version);
                return DriverOutcome::err(DriverError::Version { text });
            }
        }

        // Phase 1c: file layer, after CLI and env so the config-path
        // parameter can point at the file.
        if let Some(ref file_config) = file_config {
            let supplied = schema.config_path_param().and_then(|spec| {
                supplied_path(&layers.cli, spec.name())
                    .or_else(|| supplied_path(&layers.env, spec.name()))
            });
            let result = parse_file(&schema, file_config, supplied.as_deref());
            layers.file = result.output;
            file_resolution = Some(result.resolution);
            tracing::debug!(
                count = layers.file.values.len(),
                picked = ?file_resolution.as_ref().and_then(|r| r.picked()),
                "driver: parsed file layer"
            );

            // A file that cannot be loaded or parsed is fatal immediately.
            let file_is_broken = layers
                .file
                .diagnostics
                .iter()
                .any(|d| d.kind == Some(ErrorKind::ConfigFileParse));
            if file_is_broken {
                let diagnostics = collect_diagnostics(&layers);
                return DriverOutcome::err(DriverError::Failed {
                    report: Box::new(DriverReport {
                        diagnostics,
                        layers,
                        file_resolution,
                        overrides: Vec::new(),
                        cli_args_source,
                    }),
                });
            }
        }

        let mut all_diagnostics = collect_diagnostics(&layers);

        // Phase 3: defaults layer from the schema.
        for spec in schema.params().filter(|p| !p.is_builtin()) {
            let Some(raw) = spec.default_raw() else {
                continue;
            };
            let candidate = if spec.is_repeated() {
                let elements = parse_comma_separated(raw)
                    .into_iter()
                    .map(|e| ConfigValue::string(e, Provenance::Default))
                    .collect();
                ConfigValue::Array(crate::config_value::Sourced::with_provenance(
                    elements,
                    Provenance::Default,
                ))
            } else {
                ConfigValue::string(raw, Provenance::Default)
            };
            layers
                .defaults
                .values
                .insert(spec.name().to_string(), candidate);
        }

        // Phase 4: merge layers by priority.
        let merged = merge_layers(
            &schema,
            vec![
                &layers.defaults.values,
                &layers.file.values,
                &layers.env.values,
                &layers.cli.values,
            ],
        );
        tracing::debug!(
            count = merged.values.len(),
            overrides = merged.overrides.len(),
            "driver: merged layers"
        );

        // Phase 5: convert and validate, accumulating every error.
        let (resolved, mut convert_diagnostics) = convert_params(&schema, &merged.values);
        all_diagnostics.append(&mut convert_diagnostics);

        let has_errors = all_diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error);
        let report = DriverReport {
            diagnostics: all_diagnostics,
            layers,
            file_resolution,
            overrides: merged.overrides,
            cli_args_source,
        };

        if has_errors {
            return DriverOutcome::err(DriverError::Failed {
                report: Box::new(report),
            });
        }

        DriverOutcome::ok(DriverOutput {
            params: ResolvedParams::new(resolved),
            report,
        })
    }
}

/// Whether a boolean flag was set in a layer.
fn flag_requested(layer: &LayerOutput, name: &str) -> bool {
    match layer.values.get(name) {
        Some(ConfigValue::Bool(s)) => s.value,
        Some(ConfigValue::String(s)) => s.value == "true",
        _ => false,
    }
}

/// Extract a string candidate (the config-path value) from a layer.
fn supplied_path(layer: &LayerOutput, name: &str) -> Option<String> {
    match layer.values.get(name) {
        Some(ConfigValue::String(s)) => Some(s.value.clone()),
        _ => None,
    }
}

fn collect_diagnostics(layers: &ConfigLayers) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(layers.file.diagnostics.iter().cloned());
    diagnostics.extend(layers.env.diagnostics.iter().cloned());
    diagnostics.extend(layers.cli.diagnostics.iter().cloned());
    diagnostics
}

/// Opaque result type for driver operations.
///
/// This type intentionally does NOT implement `Try`, so you cannot use `?`
/// on it directly. This prevents accidentally propagating help/version as
/// errors (which would cause exit code 1 instead of 0).
///
/// Use one of the following methods to extract the value:
/// - `.unwrap()` - handles exits correctly, returns [`ResolvedParams`]
/// - `.into_result()` - for advanced users who want to handle everything
#[must_use = "this `DriverOutcome` may contain a help/version request that should be handled"]
pub struct DriverOutcome(Result<DriverOutput, DriverError>);

impl std::fmt::Debug for DriverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Ok(output) => f
                .debug_tuple("DriverOutcome::Ok")
                .field(&output.params)
                .finish(),
            Err(e) => f.debug_tuple("DriverOutcome::Err").field(e).finish(),
        }
    }
}

impl DriverOutcome {
    /// Create a successful outcome.
    pub fn ok(output: DriverOutput) -> Self {
        Self(Ok(output))
    }

    /// Create an error outcome.
    pub fn err(error: DriverError) -> Self {
        Self(Err(error))
    }

    /// Convert to a standard `Result` for manual handling.
    ///
    /// **Warning**: If you use `?` on this result and the error is `Help`
    /// or `Version`, Rust's default error handling will exit with code 1
    /// instead of 0. Consider using `.unwrap()` instead.
    pub fn into_result(self) -> Result<DriverOutput, DriverError> {
        self.0
    }

    /// Returns `true` if this is a successful resolution.
    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }

    /// Returns `true` if this is an error or early exit request.
    pub fn is_err(&self) -> bool {
        self.0.is_err()
    }

    /// Get the resolved parameters, or print output and exit.
    ///
    /// - On success: prints warnings to stderr, returns the resolved set
    /// - On help/version: prints to stdout, exits with code 0
    /// - On error: prints diagnostics to stderr, exits with code 1
    pub fn unwrap(self) -> ResolvedParams {
        match self.0 {
            Ok(output) => output.get(),
            Err(DriverError::Help { text }) => {
                println!("{}", text);
                std::process::exit(0);
            }
            Err(DriverError::Version { text }) => {
                println!("{}", text);
                std::process::exit(0);
            }
            Err(DriverError::Failed { report }) => {
                eprintln!("{}", report.render_pretty());
                std::process::exit(1);
            }
        }
    }

    /// Unwrap the error, panicking if this is a success.
    ///
    /// Useful for testing error cases.
    ///
    /// # Panics
    ///
    /// Panics if this is a successful resolution.
    pub fn unwrap_err(self) -> DriverError {
        match self.0 {
            Ok(_) => panic!("called `DriverOutcome::unwrap_err()` on a success"),
            Err(e) => e,
        }
    }
}

/// Successful driver output: the resolved set plus an execution report.
#[derive(Debug)]
pub struct DriverOutput {
    /// The resolved parameter set.
    pub params: ResolvedParams,
    /// Diagnostics and metadata produced by the driver.
    pub report: DriverReport,
}

impl DriverOutput {
    /// Get the resolved set, printing any warnings to stderr.
    pub fn get(self) -> ResolvedParams {
        self.print_warnings();
        self.params
    }

    /// Get the resolved set silently (no warning output).
    pub fn get_silent(self) -> ResolvedParams {
        self.params
    }

    /// Get the resolved set and report separately.
    pub fn into_parts(self) -> (ResolvedParams, DriverReport) {
        (self.params, self.report)
    }

    /// Print any warnings to stderr.
    pub fn print_warnings(&self) {
        for diagnostic in &self.report.diagnostics {
            if diagnostic.severity == Severity::Warning {
                eprintln!("{}: {}", diagnostic.severity.as_str(), diagnostic.message);
            }
        }
    }

    /// Print the provenance dump to stdout.
    pub fn dump(&self) {
        crate::dump::print_values(&self.params, self.report.file_resolution.as_ref());
    }
}

/// Full report of the driver execution.
#[derive(Default)]
pub struct DriverReport {
    /// Diagnostics emitted during resolution.
    pub diagnostics: Vec<Diagnostic>,
    /// Per-layer outputs, including unused keys and layer diagnostics.
    pub layers: ConfigLayers,
    /// File resolution metadata (paths tried, picked, etc).
    pub file_resolution: Option<FileResolution>,
    /// Records of values that were overridden during merge.
    pub overrides: Vec<Override>,
    /// The flattened CLI arguments, for rendering CLI spans.
    pub cli_args_source: String,
}

impl DriverReport {
    /// Error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Error diagnostics of a particular kind.
    pub fn errors_of_kind(&self, kind: ErrorKind) -> Vec<&Diagnostic> {
        self.errors().filter(|d| d.kind == Some(kind)).collect()
    }

    /// Render the report using Ariadne for pretty error display.
    pub fn render_pretty(&self) -> String {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        if self.diagnostics.is_empty() {
            return String::new();
        }

        let mut output = Vec::new();

        for diagnostic in &self.diagnostics {
            let (source_name, source_contents) =
                source_for(diagnostic.provenance.as_ref(), &self.cli_args_source);

            // Diagnostics without a usable span print as plain lines (e.g.
            // a missing required parameter points at no location).
            let span = diagnostic.span.filter(|s| s.end() <= source_contents.len());
            let Some(span) = span else {
                let prefix = match diagnostic.severity {
                    Severity::Error => "Error: ",
                    Severity::Warning => "Warning: ",
                    Severity::Note => "Note: ",
                };
                output.extend_from_slice(prefix.as_bytes());
                output.extend_from_slice(diagnostic.message.as_bytes());
                output.push(b'\n');
                continue;
            };

            let range = span.offset..span.end();

            let report_kind = match diagnostic.severity {
                Severity::Error => ReportKind::Error,
                Severity::Warning => ReportKind::Warning,
                Severity::Note => ReportKind::Advice,
            };

            let color = match diagnostic.severity {
                Severity::Error => Color::Red,
                Severity::Warning => Color::Yellow,
                Severity::Note => Color::Cyan,
            };

            let mut cache = NamedSource {
                name: source_name,
                source: Source::from(source_contents),
            };

            let report = Report::build(report_kind, range.clone())
                .with_message(&diagnostic.message)
                .with_label(
                    Label::new(range)
                        .with_message(&diagnostic.message)
                        .with_color(color),
                )
                .finish();

            report.write(&mut cache, &mut output).ok();
        }

        String::from_utf8(output).unwrap_or_else(|_| "error rendering diagnostics".to_string())
    }
}

impl core::fmt::Display for DriverReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render_pretty())
    }
}

impl core::fmt::Debug for DriverReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render_pretty())
    }
}

/// Pick the source name and contents a diagnostic's span points into.
fn source_for(provenance: Option<&Provenance>, cli_args_source: &str) -> (String, String) {
    match provenance {
        Some(Provenance::File { file, .. }) => (file.path.to_string(), file.contents.clone()),
        Some(Provenance::Env { var, value }) => (format!("${var}"), value.clone()),
        Some(Provenance::Default) => ("<default>".to_string(), String::new()),
        Some(Provenance::Cli { .. }) | None => ("<cli>".to_string(), cli_args_source.to_string()),
    }
}

/// A simple cache that wraps a Source and provides a display name.
struct NamedSource {
    name: String,
    source: ariadne::Source<String>,
}

impl ariadne::Cache<()> for NamedSource {
    type Storage = String;

    fn fetch(&mut self, _: &()) -> Result<&ariadne::Source<Self::Storage>, impl std::fmt::Debug> {
        Ok::<_, std::convert::Infallible>(&self.source)
    }

    fn display<'a>(&self, _: &'a ()) -> Option<impl std::fmt::Display + 'a> {
        Some(self.name.clone())
    }
}

/// Error returned by the driver.
///
/// Not all variants are "errors" in the traditional sense - Help and
/// Version are successful operations that just don't produce a resolved
/// set.
pub enum DriverError {
    /// Resolution or validation failed - exit code 1.
    Failed {
        /// Report containing all diagnostics.
        report: Box<DriverReport>,
    },

    /// Help was requested - exit code 0.
    Help {
        /// Formatted help text.
        text: String,
    },

    /// Version was requested - exit code 0.
    Version {
        /// Version string.
        text: String,
    },
}

impl DriverError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Failed { .. } => 1,
            DriverError::Help { .. } => 0,
            DriverError::Version { .. } => 0,
        }
    }

    /// Returns true if this is a "success" error (help, version).
    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Returns true if this is a help request.
    pub fn is_help(&self) -> bool {
        matches!(self, DriverError::Help { .. })
    }

    /// Returns the help text if this is a help request.
    pub fn help_text(&self) -> Option<&str> {
        match self {
            DriverError::Help { text } => Some(text),
            _ => None,
        }
    }

    /// Returns the failure report, if resolution failed.
    pub fn report(&self) -> Option<&DriverReport> {
        match self {
            DriverError::Failed { report } => Some(report),
            _ => None,
        }
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Failed { report } => write!(f, "{}", report),
            DriverError::Help { text } => write!(f, "{}", text),
            DriverError::Version { text } => write!(f, "{}", text),
        }
    }
}

impl std::fmt::Debug for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for DriverError {}

impl std::process::Termination for DriverError {
    fn report(self) -> std::process::ExitCode {
        match &self {
            DriverError::Help { text } | DriverError::Version { text } => {
                println!("{}", text);
            }
            DriverError::Failed { report } => {
                eprintln!("{}", report.render_pretty());
            }
        }
        std::process::ExitCode::from(self.exit_code() as u8)
    }
}
