//! Config file format abstraction.
//!
//! Formats parse file contents into a flat map of key → candidate value.
//! Two formats are built in: [`KeyValueFormat`], a forgiving `key = value`
//! syntax, and [`TomlFormat`], which flattens nested tables into dotted
//! keys. Additional formats plug in through the [`ConfigFormat`] trait and
//! the [`FormatRegistry`](crate::layers::file::FormatRegistry).

use std::string::String;

use indexmap::IndexMap;

use crate::config_value::{ConfigValue, Sourced};
use crate::span::Span;

/// Flat key → value map produced by parsing a config file.
pub type FileValues = IndexMap<String, ConfigValue>;

/// Error returned when parsing a config file fails.
#[derive(Debug)]
pub struct ConfigFormatError {
    /// Human-readable error message.
    pub message: String,

    /// Byte offset in the source where the error occurred, if known.
    pub offset: Option<usize>,
}

impl ConfigFormatError {
    /// Create a new error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a new error with a message and source offset.
    pub fn with_offset(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

impl core::fmt::Display for ConfigFormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(offset) = self.offset {
            write!(f, "at byte {}: {}", offset, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ConfigFormatError {}

/// Trait for config file format parsers.
///
/// Implementations parse file contents into [`FileValues`], preserving
/// source spans where possible so that error messages can point at the
/// exact location in the file.
pub trait ConfigFormat: Send + Sync {
    /// File extensions this format handles (without the leading dot).
    fn extensions(&self) -> &[&str];

    /// Parse file contents into a flat key → value map.
    fn parse(&self, contents: &str) -> Result<FileValues, ConfigFormatError>;
}

// ============================================================================
// KeyValueFormat
// ============================================================================

/// The default `key = value` format.
///
/// Recognized syntax, kept deliberately forgiving:
///
/// ```text
/// # comments with '#' or ';'
/// [sections are tolerated and ignored]
/// port = 8080
/// host: localhost
/// verbose            # a bare key means true
/// plugins = [alpha, beta, gamma]
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueFormat;

impl ConfigFormat for KeyValueFormat {
    fn extensions(&self) -> &[&str] {
        &["ini", "conf", "cfg", "txt"]
    }

    fn parse(&self, contents: &str) -> Result<FileValues, ConfigFormatError> {
        let mut values = FileValues::new();
        let mut line_start = 0usize;

        for (lineno, raw_line) in contents.split('\n').enumerate() {
            let consumed = raw_line.len() + 1;
            let leading_ws = raw_line.len() - raw_line.trim_start().len();
            let line = raw_line.trim();

            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with(';')
                || line.starts_with('[')
                || line.starts_with("---")
            {
                line_start += consumed;
                continue;
            }

            let line = strip_trailing_comment(line).trim_end();
            let line_offset = line_start + leading_ws;

            match parse_line(line, line_offset) {
                Some((key, value)) => {
                    values.insert(key, value);
                }
                None => {
                    return Err(ConfigFormatError::with_offset(
                        format!("unexpected line {}: {:?}", lineno + 1, line),
                        line_offset,
                    ));
                }
            }

            line_start += consumed;
        }

        Ok(values)
    }
}

/// Cut a trailing comment: '#' or ';' preceded by whitespace.
fn strip_trailing_comment(line: &str) -> &str {
    let mut prev_is_ws = false;
    for (idx, ch) in line.char_indices() {
        if (ch == '#' || ch == ';') && prev_is_ws {
            return &line[..idx];
        }
        prev_is_ws = ch.is_whitespace();
    }
    line
}

/// Parse one content line into a key and a candidate value.
///
/// Returns None if the line is not a recognized key/value shape.
fn parse_line(line: &str, line_offset: usize) -> Option<(String, ConfigValue)> {
    if let Some(sep_idx) = line.find(['=', ':']) {
        let key = line[..sep_idx].trim_end();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return None;
        }
        let rest = &line[sep_idx + 1..];
        let value_rel = sep_idx + 1 + (rest.len() - rest.trim_start().len());
        let value = rest.trim();
        return Some((
            key.to_string(),
            make_value(value, line_offset + value_rel),
        ));
    }

    // No separator: either a bare key (meaning true) or `key value`.
    match line.find(char::is_whitespace) {
        None => {
            let span = Span::new(line_offset, line.len());
            Some((
                line.to_string(),
                ConfigValue::Bool(Sourced {
                    value: true,
                    span: Some(span),
                    provenance: None,
                }),
            ))
        }
        Some(key_end) => {
            let key = &line[..key_end];
            let rest = &line[key_end..];
            let value_rel = key_end + (rest.len() - rest.trim_start().len());
            let value = rest.trim();
            if value.chars().any(char::is_whitespace) {
                return None;
            }
            Some((key.to_string(), make_value(value, line_offset + value_rel)))
        }
    }
}

/// Build a ConfigValue for a raw value string, handling `[a, b]` lists.
fn make_value(value: &str, offset: usize) -> ConfigValue {
    let span = Some(Span::new(offset, value.len()));

    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let inner = &value[1..value.len() - 1];
        let elements: Vec<ConfigValue> = inner
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| ConfigValue::String(Sourced::new(e.to_string())))
            .collect();
        return ConfigValue::Array(Sourced {
            value: elements,
            span,
            provenance: None,
        });
    }

    ConfigValue::String(Sourced {
        value: value.to_string(),
        span,
        provenance: None,
    })
}

// ============================================================================
// TomlFormat
// ============================================================================

/// TOML config files. Nested tables flatten to dotted keys, so
/// `[server] port = 1` feeds a parameter that accepts the config key
/// `server.port`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl ConfigFormat for TomlFormat {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, contents: &str) -> Result<FileValues, ConfigFormatError> {
        let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| {
            match e.span() {
                Some(span) => ConfigFormatError::with_offset(e.message().to_string(), span.start),
                None => ConfigFormatError::new(e.message().to_string()),
            }
        })?;

        let mut values = FileValues::new();
        flatten_table(&table, "", &mut values)?;
        Ok(values)
    }
}

fn flatten_table(
    table: &toml::Table,
    prefix: &str,
    out: &mut FileValues,
) -> Result<(), ConfigFormatError> {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten_table(nested, &full, out)?,
            other => {
                out.insert(full.clone(), convert_toml(other, &full)?);
            }
        }
    }
    Ok(())
}

fn convert_toml(value: &toml::Value, key: &str) -> Result<ConfigValue, ConfigFormatError> {
    Ok(match value {
        toml::Value::String(s) => ConfigValue::String(Sourced::new(s.clone())),
        toml::Value::Integer(i) => ConfigValue::Integer(Sourced::new(*i)),
        toml::Value::Float(f) => ConfigValue::Float(Sourced::new(*f)),
        toml::Value::Boolean(b) => ConfigValue::Bool(Sourced::new(*b)),
        toml::Value::Datetime(d) => ConfigValue::String(Sourced::new(d.to_string())),
        toml::Value::Array(items) => {
            let elements = items
                .iter()
                .map(|v| convert_toml(v, key))
                .collect::<Result<Vec<_>, _>>()?;
            ConfigValue::Array(Sourced::new(elements))
        }
        toml::Value::Table(_) => {
            return Err(ConfigFormatError::new(format!(
                "nested table in array is not supported (key '{key}')"
            )));
        }
    })
}
