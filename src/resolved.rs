//! The resolved parameter set.
//!
//! Constructed once per invocation, read-only thereafter: each declared
//! parameter that received a value maps to exactly one typed [`ParamValue`]
//! plus the provenance of the winning candidate.

use indexmap::IndexMap;

use crate::provenance::Provenance;

/// A fully-typed resolved value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string.
    String(String),
    /// A list of values (all of the declared element kind).
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// The boolean value, if this is a Bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, if this is an Integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The float value, if this is a Float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string value, if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is a List.
    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::String(s) => write!(f, "{s}"),
            ParamValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// One resolved parameter: the typed value and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedParam {
    /// The typed value.
    pub value: ParamValue,
    /// Provenance of the winning candidate.
    pub provenance: Provenance,
}

/// Final merged, typed configuration for the process.
#[derive(Debug, Clone, Default)]
pub struct ResolvedParams {
    values: IndexMap<String, ResolvedParam>,
}

impl ResolvedParams {
    pub(crate) fn new(values: IndexMap<String, ResolvedParam>) -> Self {
        Self { values }
    }

    /// Look up a resolved value by parameter name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name).map(|p| &p.value)
    }

    /// The string value of a parameter, if resolved to a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// The integer value of a parameter, if resolved to an integer.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    /// The float value of a parameter, if resolved to a float.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_float)
    }

    /// The boolean value of a parameter, if resolved to a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    /// The elements of a list parameter, if resolved to a list.
    pub fn get_list(&self, name: &str) -> Option<&[ParamValue]> {
        self.get(name).and_then(ParamValue::as_list)
    }

    /// Where a parameter's winning value came from.
    pub fn provenance(&self, name: &str) -> Option<&Provenance> {
        self.values.get(name).map(|p| &p.provenance)
    }

    /// Whether a parameter resolved to a value.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over resolved parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedParam)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resolved parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResolvedParams {
        let mut values = IndexMap::new();
        values.insert(
            "port".to_string(),
            ResolvedParam {
                value: ParamValue::Integer(8080),
                provenance: Provenance::env("APP_PORT", "8080"),
            },
        );
        values.insert(
            "hosts".to_string(),
            ResolvedParam {
                value: ParamValue::List(vec![
                    ParamValue::String("a".into()),
                    ParamValue::String("b".into()),
                ]),
                provenance: Provenance::Default,
            },
        );
        ResolvedParams::new(values)
    }

    #[test]
    fn test_typed_accessors() {
        let params = params();
        assert_eq!(params.get_int("port"), Some(8080));
        assert_eq!(params.get_str("port"), None);
        assert_eq!(params.get_list("hosts").unwrap().len(), 2);
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_provenance_lookup() {
        let params = params();
        assert!(params.provenance("port").unwrap().is_env());
        assert!(params.provenance("hosts").unwrap().is_default());
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamValue::Integer(42).to_string(), "42");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        let list = ParamValue::List(vec![
            ParamValue::String("a".into()),
            ParamValue::Integer(2),
        ]);
        assert_eq!(list.to_string(), "[a, 2]");
    }
}
