#![warn(missing_docs)]
#![deny(unsafe_code)]
#![doc = include_str!("../README.md")]

pub(crate) mod builder;
pub(crate) mod config_format;
pub(crate) mod config_value;
pub(crate) mod convert;
pub(crate) mod driver;
pub(crate) mod dump;
pub(crate) mod help;
pub(crate) mod layers;
pub(crate) mod merge;
pub(crate) mod provenance;
pub(crate) mod resolved;
pub(crate) mod schema;
pub(crate) mod span;

// ==========================================
// PUBLIC INTERFACE
// ==========================================

pub use builder::{builder, Config, ConfigBuilder, FileConfigBuilder, HelpConfigBuilder};
pub use config_format::{ConfigFormat, ConfigFormatError, FileValues, KeyValueFormat, TomlFormat};
pub use config_value::{ConfigValue, Sourced};
pub use driver::{
    ConfigLayers, Diagnostic, Driver, DriverError, DriverOutcome, DriverOutput, DriverReport,
    ErrorKind, LayerOutput, Severity, UnusedKey,
};
pub use dump::{format_values, print_values, write_values};
pub use help::{generate_help, HelpConfig};
pub use layers::cli::{CliConfig, CliConfigBuilder};
pub use layers::env::{EnvConfig, EnvConfigBuilder, EnvSource, MockEnv, StdEnv};
pub use layers::file::{FileConfig, FormatRegistry};
pub use provenance::{
    ConfigFile, FilePathResolution, FilePathStatus, FileResolution, Override, Provenance,
};
pub use resolved::{ParamValue, ResolvedParam, ResolvedParams};
pub use schema::{MergePolicy, ParamSpec, Schema, SchemaBuilder, SchemaError, ValueKind};
pub use span::Span;
