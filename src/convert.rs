//! Conversion of winning candidates to their declared kinds.
//!
//! This is the single place where raw candidates become typed values, so
//! every failure can name the parameter, the source it came from, and the
//! raw value. Failures accumulate; the caller reports them all together.

use indexmap::IndexMap;

use crate::config_value::ConfigValue;
use crate::driver::{Diagnostic, ErrorKind, Severity};
use crate::resolved::{ParamValue, ResolvedParam};
use crate::schema::{ParamSpec, Schema, ValueKind};

/// Convert every declared parameter's winning candidate, accumulating
/// conversion and missing-required diagnostics.
pub fn convert_params(
    schema: &Schema,
    merged: &IndexMap<String, ConfigValue>,
) -> (IndexMap<String, ResolvedParam>, Vec<Diagnostic>) {
    let mut resolved = IndexMap::new();
    let mut diagnostics = Vec::new();

    for spec in schema.params().filter(|p| !p.is_builtin()) {
        match merged.get(spec.name()) {
            Some(candidate) => match convert_candidate(spec, candidate) {
                Ok(value) => {
                    let provenance = candidate.provenance().cloned().unwrap_or_default();
                    resolved.insert(
                        spec.name().to_string(),
                        ResolvedParam { value, provenance },
                    );
                }
                Err(mut errors) => diagnostics.append(&mut errors),
            },
            None => {
                if spec.is_required() {
                    diagnostics.push(missing_required(spec));
                }
            }
        }
    }

    (resolved, diagnostics)
}

fn missing_required(spec: &ParamSpec) -> Diagnostic {
    let hint = if spec.is_positional() {
        format!("<{}>", spec.long_flag())
    } else {
        format!("--{}", spec.long_flag())
    };
    Diagnostic {
        kind: Some(ErrorKind::MissingRequired),
        message: format!(
            "missing required parameter '{}' (set via {hint})",
            spec.name()
        ),
        span: None,
        provenance: None,
        severity: Severity::Error,
    }
}

/// Convert one candidate to the parameter's declared kind.
fn convert_candidate(spec: &ParamSpec, candidate: &ConfigValue) -> Result<ParamValue, Vec<Diagnostic>> {
    if spec.is_repeated() {
        let elements: Vec<&ConfigValue> = match candidate {
            ConfigValue::Array(arr) => arr.value.iter().collect(),
            scalar => vec![scalar],
        };

        let mut converted = Vec::with_capacity(elements.len());
        let mut errors = Vec::new();
        for element in elements {
            match convert_scalar(spec, element) {
                Ok(value) => converted.push(value),
                Err(diag) => errors.push(diag),
            }
        }
        if errors.is_empty() {
            Ok(ParamValue::List(converted))
        } else {
            Err(errors)
        }
    } else {
        convert_scalar(spec, candidate).map_err(|diag| vec![diag])
    }
}

/// Convert one scalar candidate.
fn convert_scalar(spec: &ParamSpec, candidate: &ConfigValue) -> Result<ParamValue, Diagnostic> {
    let converted = match (spec.kind(), candidate) {
        (ValueKind::Bool, ConfigValue::Bool(s)) => Some(ParamValue::Bool(s.value)),
        (ValueKind::Bool, ConfigValue::String(s)) => parse_bool(&s.value).map(ParamValue::Bool),

        (ValueKind::Integer, ConfigValue::Integer(s)) => Some(ParamValue::Integer(s.value)),
        (ValueKind::Integer, ConfigValue::String(s)) => {
            s.value.trim().parse::<i64>().ok().map(ParamValue::Integer)
        }

        (ValueKind::Float, ConfigValue::Float(s)) => Some(ParamValue::Float(s.value)),
        (ValueKind::Float, ConfigValue::Integer(s)) => Some(ParamValue::Float(s.value as f64)),
        (ValueKind::Float, ConfigValue::String(s)) => {
            s.value.trim().parse::<f64>().ok().map(ParamValue::Float)
        }

        (ValueKind::String, ConfigValue::String(s)) => Some(ParamValue::String(s.value.clone())),
        // Typed file values coerce to their literal spelling for string
        // parameters, matching the string-centric sources.
        (ValueKind::String, ConfigValue::Integer(_))
        | (ValueKind::String, ConfigValue::Float(_))
        | (ValueKind::String, ConfigValue::Bool(_)) => {
            Some(ParamValue::String(candidate.raw_display()))
        }

        _ => None,
    };

    converted.ok_or_else(|| conversion_error(spec, candidate))
}

fn conversion_error(spec: &ParamSpec, candidate: &ConfigValue) -> Diagnostic {
    let provenance = candidate.provenance().cloned().unwrap_or_default();
    let expected = if spec.is_repeated() && matches!(candidate, ConfigValue::Array(_)) {
        // Unreachable for arrays (handled element-wise), kept for clarity.
        "list"
    } else {
        spec.kind().as_str()
    };
    Diagnostic {
        kind: Some(ErrorKind::TypeConversion),
        message: format!(
            "invalid value for '{}' ({provenance}): {:?} is not a valid {expected}",
            spec.name(),
            candidate.raw_display(),
        ),
        span: candidate.span(),
        provenance: Some(provenance),
        severity: Severity::Error,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
