//! Parameter specifications and the schema registry.
//!
//! A [`ParamSpec`] declares one configurable value: its canonical name, the
//! command-line surface, the config-file keys and environment variables that
//! may feed it, the declared value kind, an optional default, and whether it
//! is required. A [`Schema`] is the validated, immutable set of
//! specifications the resolver works against.

use std::string::String;
use std::vec::Vec;

use heck::{ToKebabCase, ToShoutySnakeCase};
use indexmap::IndexMap;

/// The declared kind of a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A boolean flag or true/false value.
    Bool,
    /// A 64-bit signed integer.
    Integer,
    /// A 64-bit float.
    Float,
    /// An arbitrary string.
    String,
}

impl ValueKind {
    /// A short name for error messages and help placeholders.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
        }
    }
}

/// How a list parameter combines candidates from several sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// The highest-precedence source wins outright (the default).
    #[default]
    Replace,
    /// Candidates from every source are concatenated, lowest precedence
    /// first, so the highest-precedence elements come last.
    Append,
}

/// Declared shape of one configurable value. Immutable once registered.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    long: Option<String>,
    short: Option<char>,
    positional: bool,
    kind: ValueKind,
    repeated: bool,
    required: bool,
    default: Option<String>,
    config_keys: Vec<String>,
    env_vars: Vec<String>,
    merge: MergePolicy,
    help: Option<String>,
    is_config_path: bool,
    builtin: bool,
}

impl ParamSpec {
    /// Create a scalar parameter with the given canonical name and kind.
    ///
    /// The long flag defaults to the kebab-cased name (`log_level` becomes
    /// `--log-level`).
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            long: None,
            short: None,
            positional: false,
            kind,
            repeated: false,
            required: false,
            default: None,
            config_keys: Vec::new(),
            env_vars: Vec::new(),
            merge: MergePolicy::default(),
            help: None,
            is_config_path: false,
            builtin: false,
        }
    }

    /// Create a list parameter whose elements have the given kind.
    pub fn list(name: impl Into<String>, kind: ValueKind) -> Self {
        let mut spec = Self::new(name, kind);
        spec.repeated = true;
        spec
    }

    pub(crate) fn builtin(name: &str, short: char, help: &str) -> Self {
        let mut spec = Self::new(name, ValueKind::Bool);
        spec.short = Some(short);
        spec.help = Some(help.to_string());
        spec.builtin = true;
        spec
    }

    /// Override the long flag (without the leading dashes).
    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    /// Add a short flag character.
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Make this a positional argument instead of a flag.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a default value, given as a raw string and converted like any
    /// other candidate.
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Add an extra config-file key that feeds this parameter. The
    /// canonical name and the long flag are always accepted.
    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_keys.push(key.into());
        self
    }

    /// Add an explicit environment variable alias. When any alias is
    /// declared, only the aliases are consulted; the derived
    /// `PREFIX_NAME` variable is used only for parameters without one.
    pub fn env_var(mut self, var: impl Into<String>) -> Self {
        self.env_vars.push(var.into());
        self
    }

    /// Set the merge policy for a list parameter.
    pub fn merge(mut self, policy: MergePolicy) -> Self {
        self.merge = policy;
        self
    }

    /// Set the help text shown for this parameter.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Mark this parameter as the config-file path: its resolved CLI or
    /// environment value names the file the file layer should load.
    pub fn config_path(mut self) -> Self {
        self.is_config_path = true;
        self
    }

    /// The canonical parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The long flag (without dashes): the explicit override or the
    /// kebab-cased name.
    pub fn long_flag(&self) -> String {
        match &self.long {
            Some(long) => long.clone(),
            None => self.name.to_kebab_case(),
        }
    }

    /// The short flag character, if any.
    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    /// Whether this is a positional argument.
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// The declared value kind (element kind for lists).
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether this is a list parameter.
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// Whether the parameter must resolve to a value.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The raw default string, if declared.
    pub fn default_raw(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Extra config-file keys.
    pub fn config_keys(&self) -> &[String] {
        &self.config_keys
    }

    /// Explicit environment variable aliases.
    pub fn env_aliases(&self) -> &[String] {
        &self.env_vars
    }

    /// The merge policy for list parameters.
    pub fn merge_policy(&self) -> MergePolicy {
        self.merge
    }

    /// The help text, if any.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Whether this parameter carries the config-file path.
    pub fn is_config_path(&self) -> bool {
        self.is_config_path
    }

    /// Whether this is an auto-registered help/version flag.
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The environment variable name derived from the prefix and the
    /// parameter name, e.g. prefix `APP` and name `log_level` give
    /// `APP_LOG_LEVEL`.
    pub fn derived_env_var(&self, prefix: &str) -> String {
        let name = self.name.to_shouty_snake_case();
        if prefix.is_empty() {
            name
        } else {
            format!("{prefix}_{name}")
        }
    }

    /// Whether the given config-file key feeds this parameter.
    ///
    /// Accepted spellings: the canonical name, the long flag, any declared
    /// alias, and the underscore/dash-normalized form of the name.
    pub(crate) fn matches_config_key(&self, key: &str) -> bool {
        if key == self.name || key == self.long_flag() {
            return true;
        }
        if self.config_keys.iter().any(|k| k == key) {
            return true;
        }
        key.replace('-', "_") == self.name.replace('-', "_")
    }
}

/// The validated, immutable registry of parameter specifications.
#[derive(Debug, Clone)]
pub struct Schema {
    params: IndexMap<String, ParamSpec>,
    auto_help: bool,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Look up a parameter by canonical name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.values()
    }

    /// Positional parameters in declaration order.
    pub fn positionals(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.values().filter(|p| p.is_positional())
    }

    /// Named (flag) parameters in declaration order.
    pub fn named(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.values().filter(|p| !p.is_positional())
    }

    /// Find the parameter for a long flag (without dashes).
    pub(crate) fn find_long(&self, flag: &str) -> Option<&ParamSpec> {
        self.params
            .values()
            .filter(|p| !p.is_positional())
            .find(|p| p.long_flag() == flag || p.name() == flag)
    }

    /// Find the parameter for a short flag.
    pub(crate) fn find_short(&self, short: char) -> Option<&ParamSpec> {
        self.params
            .values()
            .filter(|p| !p.is_positional())
            .find(|p| p.short_flag() == Some(short))
    }

    /// Find the parameter a config-file key feeds. Positionals are not
    /// config-settable.
    pub(crate) fn find_config_key(&self, key: &str) -> Option<&ParamSpec> {
        self.params
            .values()
            .filter(|p| !p.is_builtin() && !p.is_positional())
            .find(|p| p.matches_config_key(key))
    }

    /// The config-file path parameter, if one was declared.
    pub fn config_path_param(&self) -> Option<&ParamSpec> {
        self.params.values().find(|p| p.is_config_path())
    }

    /// Whether help/version flags were auto-registered.
    pub fn auto_help(&self) -> bool {
        self.auto_help
    }
}

/// Builder for [`Schema`]. Validates the whole set at [`build`](Self::build).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    specs: Vec<ParamSpec>,
    disable_help: bool,
}

impl SchemaBuilder {
    /// Create a new empty schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter specification.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Do not auto-register the `--help`/`-h` and `--version`/`-V` flags.
    pub fn disable_help(mut self) -> Self {
        self.disable_help = true;
        self
    }

    /// Validate and build the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut specs = Vec::new();
        if !self.disable_help {
            specs.push(ParamSpec::builtin("help", 'h', "Print help information"));
            specs.push(ParamSpec::builtin(
                "version",
                'V',
                "Print version information",
            ));
        }
        specs.extend(self.specs);

        let mut params: IndexMap<String, ParamSpec> = IndexMap::new();
        let mut repeated_positional_seen = false;

        for spec in specs {
            if spec.name.is_empty() || spec.name.chars().any(char::is_whitespace) {
                return Err(SchemaError::InvalidName(spec.name));
            }
            if spec.is_positional() {
                if spec.short_flag().is_some() {
                    return Err(SchemaError::PositionalWithShort(spec.name));
                }
                if !spec.env_aliases().is_empty() {
                    return Err(SchemaError::PositionalWithEnv(spec.name));
                }
                if repeated_positional_seen {
                    return Err(SchemaError::PositionalAfterRepeated(spec.name));
                }
                if spec.is_repeated() {
                    repeated_positional_seen = true;
                }
            }
            if spec.is_config_path()
                && (spec.kind() != ValueKind::String || spec.is_positional() || spec.is_repeated())
            {
                return Err(SchemaError::InvalidConfigPathParam(spec.name));
            }
            if spec.is_required() && spec.default_raw().is_some() {
                return Err(SchemaError::RequiredWithDefault(spec.name));
            }

            if params.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateName(spec.name));
            }

            for existing in params.values() {
                if !spec.is_positional() && !existing.is_positional() {
                    if existing.long_flag() == spec.long_flag() {
                        return Err(SchemaError::DuplicateFlag(spec.long_flag()));
                    }
                    if let (Some(a), Some(b)) = (existing.short_flag(), spec.short_flag()) {
                        if a == b {
                            return Err(SchemaError::DuplicateShort(a));
                        }
                    }
                }
            }

            params.insert(spec.name.clone(), spec);
        }

        if params.values().filter(|p| p.is_config_path()).count() > 1 {
            return Err(SchemaError::MultipleConfigPathParams);
        }

        Ok(Schema {
            params,
            auto_help: !self.disable_help,
        })
    }
}

/// Error raised when a schema is malformed. These are programming errors
/// surfaced at build time, before any source is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Parameter name is empty or contains whitespace.
    InvalidName(String),
    /// Two parameters share a canonical name.
    DuplicateName(String),
    /// Two parameters share a long flag.
    DuplicateFlag(String),
    /// Two parameters share a short flag.
    DuplicateShort(char),
    /// A positional parameter declared a short flag.
    PositionalWithShort(String),
    /// A positional parameter declared an environment alias.
    PositionalWithEnv(String),
    /// A positional parameter follows a repeated positional.
    PositionalAfterRepeated(String),
    /// The config-path parameter must be a scalar string flag.
    InvalidConfigPathParam(String),
    /// A required parameter also declared a default, which could never
    /// apply.
    RequiredWithDefault(String),
    /// More than one parameter is marked as the config-file path.
    MultipleConfigPathParams,
}

impl core::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SchemaError::InvalidName(name) => write!(f, "invalid parameter name {name:?}"),
            SchemaError::DuplicateName(name) => {
                write!(f, "duplicate parameter name '{name}'")
            }
            SchemaError::DuplicateFlag(flag) => write!(f, "duplicate flag '--{flag}'"),
            SchemaError::DuplicateShort(short) => write!(f, "duplicate flag '-{short}'"),
            SchemaError::PositionalWithShort(name) => {
                write!(f, "positional parameter '{name}' cannot have a short flag")
            }
            SchemaError::PositionalWithEnv(name) => write!(
                f,
                "positional parameter '{name}' cannot have an environment alias"
            ),
            SchemaError::PositionalAfterRepeated(name) => write!(
                f,
                "positional parameter '{name}' cannot follow a repeated positional"
            ),
            SchemaError::InvalidConfigPathParam(name) => write!(
                f,
                "config-path parameter '{name}' must be a scalar string flag"
            ),
            SchemaError::RequiredWithDefault(name) => write!(
                f,
                "parameter '{name}' is required but declares a default that could never apply"
            ),
            SchemaError::MultipleConfigPathParams => {
                write!(f, "more than one parameter is marked as the config-file path")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
