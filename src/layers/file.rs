//! Config file layer.
//!
//! Resolves which file to load (explicit path, a path supplied through the
//! config-path parameter, or the first existing default search path), parses
//! it with the format matching its extension, and maps file keys onto
//! declared parameters. Every path considered is recorded in a
//! [`FileResolution`] so the choice is observable.

use std::string::{String, ToString};
use std::sync::Arc;
use std::vec::Vec;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config_format::{
    ConfigFormat, ConfigFormatError, FileValues, KeyValueFormat, TomlFormat,
};
use crate::driver::{Diagnostic, ErrorKind, LayerOutput, Severity, UnusedKey};
use crate::provenance::{ConfigFile, FilePathStatus, FileResolution, Provenance};
use crate::schema::Schema;
use crate::span::Span;

// ============================================================================
// Format Registry
// ============================================================================

/// A registry of config file formats, selected by file extension.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ConfigFormat>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormatRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Create a registry with the built-in formats: the `key = value`
    /// format (also used for files without an extension) and TOML.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(KeyValueFormat);
        registry.register(TomlFormat);
        registry
    }

    /// Register a new format.
    pub fn register<F: ConfigFormat + 'static>(&mut self, format: F) {
        self.formats.push(Box::new(format));
    }

    /// Find a format that handles the given file extension.
    ///
    /// The extension should not include the leading dot.
    pub fn find_by_extension(&self, extension: &str) -> Option<&dyn ConfigFormat> {
        self.formats
            .iter()
            .find(|f| {
                f.extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(extension))
            })
            .map(|f| f.as_ref())
    }

    /// Parse config contents, selecting the format based on extension.
    ///
    /// Files without an extension fall back to the first registered format.
    pub fn parse(&self, contents: &str, extension: &str) -> Result<FileValues, ConfigFormatError> {
        let format = match self.find_by_extension(extension) {
            Some(format) => format,
            None if extension.is_empty() => self
                .formats
                .first()
                .map(|f| f.as_ref())
                .ok_or_else(|| ConfigFormatError::new("no config file formats registered"))?,
            None => {
                return Err(ConfigFormatError::new(format!(
                    "unsupported file extension: .{extension}"
                )));
            }
        };
        format.parse(contents)
    }

    /// All registered extensions.
    pub fn extensions(&self) -> Vec<&str> {
        self.formats
            .iter()
            .flat_map(|f| f.extensions().iter().copied())
            .collect()
    }
}

// ============================================================================
// File Configuration
// ============================================================================

/// Configuration for config file parsing.
pub struct FileConfig {
    /// Explicit config file path set on the builder.
    pub explicit_path: Option<Utf8PathBuf>,

    /// Default paths to check if no explicit path is provided.
    pub default_paths: Vec<Utf8PathBuf>,

    /// Format registry for parsing different file types.
    pub registry: FormatRegistry,

    /// Whether to error on file keys that match no parameter.
    pub strict: bool,

    /// Inline content for testing (avoids disk I/O). The filename is used
    /// for format detection.
    pub inline_content: Option<(String, String)>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            explicit_path: None,
            default_paths: Vec::new(),
            registry: FormatRegistry::with_defaults(),
            strict: false,
            inline_content: None,
        }
    }
}

impl FileConfig {
    /// Create a new file config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit config file path.
    pub fn path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Set default paths to check for config files. They are checked in
    /// order; the first existing file is used.
    pub fn default_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.default_paths = paths.into_iter().map(|p| p.into()).collect();
        self
    }

    /// Set the format registry.
    pub fn registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Enable strict mode - error on unknown keys.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Set inline content for testing. The filename is used for format
    /// detection (e.g. "app.conf" or "settings.toml").
    pub fn content(mut self, content: impl Into<String>, filename: impl Into<String>) -> Self {
        self.inline_content = Some((content.into(), filename.into()));
        self
    }
}

// ============================================================================
// File Parsing
// ============================================================================

/// Result of file parsing, including resolution info.
pub struct FileParseResult {
    /// The layer output with parsed values and diagnostics.
    pub output: LayerOutput,
    /// Information about which paths were considered.
    pub resolution: FileResolution,
}

/// Parse the config file (if any) against the schema.
///
/// `supplied_path` is the value of the config-path parameter, when one was
/// given on the command line or in the environment.
pub fn parse_file(
    schema: &Schema,
    config: &FileConfig,
    supplied_path: Option<&str>,
) -> FileParseResult {
    let mut ctx = FileParseContext::new(schema, config);
    ctx.parse(supplied_path);
    ctx.into_result()
}

struct FileParseContext<'a> {
    schema: &'a Schema,
    config: &'a FileConfig,
    output: LayerOutput,
    resolution: FileResolution,
}

impl<'a> FileParseContext<'a> {
    fn new(schema: &'a Schema, config: &'a FileConfig) -> Self {
        Self {
            schema,
            config,
            output: LayerOutput::default(),
            resolution: FileResolution::new(),
        }
    }

    fn parse(&mut self, supplied_path: Option<&str>) {
        if let Some((content, filename)) = &self.config.inline_content {
            let path = Utf8PathBuf::from(filename);
            let content = content.clone();
            self.parse_contents(&path, &content);
            return;
        }

        let Some(path) = self.resolve_path(supplied_path) else {
            return;
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                self.emit_fatal(format!("failed to read {path}: {e}"), None, None);
                return;
            }
        };

        self.parse_contents(&path, &contents);
    }

    /// Resolve which file path to use, recording every path considered.
    fn resolve_path(&mut self, supplied_path: Option<&str>) -> Option<Utf8PathBuf> {
        let explicit = self
            .config
            .explicit_path
            .clone()
            .or_else(|| supplied_path.map(Utf8PathBuf::from));

        if let Some(explicit) = explicit {
            let exists = explicit.exists();
            self.resolution.add_explicit(explicit.clone(), exists);
            self.resolution
                .mark_defaults_not_tried(&self.config.default_paths);

            if exists {
                return Some(explicit);
            }
            self.emit_fatal(format!("config file not found: {explicit}"), None, None);
            return None;
        }

        for default_path in &self.config.default_paths {
            if default_path.exists() {
                self.resolution
                    .add_default(default_path.clone(), FilePathStatus::Picked);
                return Some(default_path.clone());
            }
            self.resolution
                .add_default(default_path.clone(), FilePathStatus::Absent);
        }

        // No file found - the file layer is optional.
        None
    }

    fn parse_contents(&mut self, path: &Utf8Path, contents: &str) {
        let extension = path.extension().unwrap_or("");
        let file = Arc::new(ConfigFile::new(path, contents));

        let parsed = match self.config.registry.parse(contents, extension) {
            Ok(values) => values,
            Err(e) => {
                let span = e.offset.map(|offset| Span::new(offset, 1));
                self.emit_fatal(
                    format!("failed to parse {path}: {}", e.message),
                    span,
                    Some(Provenance::file(file.clone(), "", 0, 0)),
                );
                return;
            }
        };

        for (key, mut value) in parsed {
            value.set_file_provenance(&file, &key);

            match self.schema.find_config_key(&key) {
                Some(spec) => {
                    self.output.values.insert(spec.name().to_string(), value);
                }
                None => {
                    let provenance = value
                        .provenance()
                        .cloned()
                        .unwrap_or(Provenance::Default);
                    self.output.unused_keys.push(UnusedKey {
                        key: key.clone(),
                        provenance: provenance.clone(),
                    });
                    if self.config.strict {
                        self.output.diagnostics.push(Diagnostic {
                            kind: Some(ErrorKind::UnknownArgument),
                            message: format!("unknown configuration key '{key}' in {path}"),
                            span: value.span(),
                            provenance: Some(provenance),
                            severity: Severity::Error,
                        });
                    }
                }
            }
        }
    }

    fn emit_fatal(&mut self, message: String, span: Option<Span>, provenance: Option<Provenance>) {
        self.output.diagnostics.push(Diagnostic {
            kind: Some(ErrorKind::ConfigFileParse),
            message,
            span,
            provenance,
            severity: Severity::Error,
        });
    }

    fn into_result(self) -> FileParseResult {
        FileParseResult {
            output: self.output,
            resolution: self.resolution,
        }
    }
}
