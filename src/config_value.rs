//! Candidate values with span and provenance tracking.
//!
//! Layers produce raw candidates as [`ConfigValue`] trees. Scalars stay in
//! whatever representation the source gave them (strings from the command
//! line and environment, typed values from TOML); conversion to the declared
//! parameter kind happens later, in one place, so every conversion failure
//! can name its source.

use std::string::String;
use std::sync::Arc;
use std::vec::Vec;

use crate::provenance::{ConfigFile, Provenance};
use crate::span::Span;

/// A value with provenance tracking.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    /// The wrapped value.
    pub value: T,
    /// The source span (offset and length), when the source is textual.
    pub span: Option<Span>,
    /// Full provenance information.
    pub provenance: Option<Provenance>,
}

impl<T> Sourced<T> {
    /// Create a new Sourced value with no provenance.
    pub fn new(value: T) -> Self {
        Self {
            value,
            span: None,
            provenance: None,
        }
    }

    /// Create a new Sourced value with provenance.
    pub fn with_provenance(value: T, provenance: Provenance) -> Self {
        let span = match &provenance {
            Provenance::File { offset, len, .. } => Some(Span::new(*offset, *len)),
            _ => None,
        };
        Self {
            value,
            span,
            provenance: Some(provenance),
        }
    }

    /// Set the provenance from a config file, using the span if available.
    pub fn set_file_provenance(&mut self, file: Arc<ConfigFile>, key: impl Into<String>) {
        let (offset, len) = match self.span {
            Some(span) => (span.offset, span.len),
            None => (0, 0),
        };
        self.provenance = Some(Provenance::file(file, key, offset, len));
    }
}

/// A raw candidate value from one source.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    /// A boolean value.
    Bool(Sourced<bool>),
    /// An integer value.
    Integer(Sourced<i64>),
    /// A floating-point value.
    Float(Sourced<f64>),
    /// A string value (the common case for CLI and env candidates).
    String(Sourced<String>),
    /// An array of values (list parameters).
    Array(Sourced<Vec<ConfigValue>>),
}

impl ConfigValue {
    /// Build a string candidate with provenance.
    pub fn string(value: impl Into<String>, provenance: Provenance) -> Self {
        ConfigValue::String(Sourced::with_provenance(value.into(), provenance))
    }

    /// Build a boolean candidate with provenance.
    pub fn bool(value: bool, provenance: Provenance) -> Self {
        ConfigValue::Bool(Sourced::with_provenance(value, provenance))
    }

    /// The provenance of this value, if set.
    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            ConfigValue::Bool(s) => s.provenance.as_ref(),
            ConfigValue::Integer(s) => s.provenance.as_ref(),
            ConfigValue::Float(s) => s.provenance.as_ref(),
            ConfigValue::String(s) => s.provenance.as_ref(),
            ConfigValue::Array(s) => s.provenance.as_ref(),
        }
    }

    /// The source span of this value, if the source is textual.
    pub fn span(&self) -> Option<Span> {
        match self {
            ConfigValue::Bool(s) => s.span,
            ConfigValue::Integer(s) => s.span,
            ConfigValue::Float(s) => s.span,
            ConfigValue::String(s) => s.span,
            ConfigValue::Array(s) => s.span,
        }
    }

    /// Set file provenance on this value and, for arrays, all elements.
    pub fn set_file_provenance(&mut self, file: &Arc<ConfigFile>, key: &str) {
        match self {
            ConfigValue::Bool(s) => s.set_file_provenance(file.clone(), key),
            ConfigValue::Integer(s) => s.set_file_provenance(file.clone(), key),
            ConfigValue::Float(s) => s.set_file_provenance(file.clone(), key),
            ConfigValue::String(s) => s.set_file_provenance(file.clone(), key),
            ConfigValue::Array(s) => {
                s.set_file_provenance(file.clone(), key);
                for item in s.value.iter_mut() {
                    item.set_file_provenance(file, key);
                }
            }
        }
    }

    /// A short name for the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Array(_) => "list",
        }
    }

    /// Render the raw value the way the user wrote it, for error messages.
    pub fn raw_display(&self) -> String {
        match self {
            ConfigValue::Bool(s) => s.value.to_string(),
            ConfigValue::Integer(s) => s.value.to_string(),
            ConfigValue::Float(s) => s.value.to_string(),
            ConfigValue::String(s) => s.value.clone(),
            ConfigValue::Array(s) => {
                let elems: Vec<String> = s.value.iter().map(|v| v.raw_display()).collect();
                format!("[{}]", elems.join(", "))
            }
        }
    }
}
