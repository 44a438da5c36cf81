//! Builder API for layered configuration.
//!
//! Start from a validated [`Schema`], switch on the layers you want, and
//! hand the resulting [`Config`] to a [`Driver`](crate::driver::Driver):
//!
//! ```ignore
//! let config = builder(schema)
//!     .cli(|c| c.args_os(std::env::args_os().skip(1)))
//!     .env(|e| e.prefix("APP"))
//!     .file(|f| f.default_paths(["app.conf"]))
//!     .help(|h| h.program_name("app").version(env!("CARGO_PKG_VERSION")))
//!     .build();
//! let params = Driver::new(config).run().unwrap();
//! ```

use camino::Utf8PathBuf;

use crate::config_format::ConfigFormat;
use crate::help::HelpConfig;
use crate::layers::{
    cli::{CliConfig, CliConfigBuilder},
    env::{EnvConfig, EnvConfigBuilder},
    file::FileConfig,
};
use crate::schema::Schema;

/// Start configuring the resolver for a schema.
pub fn builder(schema: Schema) -> ConfigBuilder {
    ConfigBuilder {
        schema,
        cli_config: None,
        help_config: None,
        env_config: None,
        file_config: None,
    }
}

/// Builder for layered configuration resolution.
pub struct ConfigBuilder {
    schema: Schema,
    cli_config: Option<CliConfig>,
    help_config: Option<HelpConfig>,
    env_config: Option<EnvConfig>,
    file_config: Option<FileConfig>,
}

/// Fully built configuration (schema + sources) for the driver.
pub struct Config {
    /// The parameter schema.
    pub(crate) schema: Schema,
    /// CLI parsing settings, if the user configured that layer.
    pub(crate) cli_config: Option<CliConfig>,
    /// Help text settings, if provided.
    pub(crate) help_config: Option<HelpConfig>,
    /// Environment parsing settings, if provided.
    pub(crate) env_config: Option<EnvConfig>,
    /// File parsing settings for the file layer.
    pub(crate) file_config: Option<FileConfig>,
}

impl ConfigBuilder {
    /// Configure CLI argument parsing.
    pub fn cli<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CliConfigBuilder) -> CliConfigBuilder,
    {
        self.cli_config = Some(f(CliConfigBuilder::new()).build());
        self
    }

    /// Configure help text generation.
    pub fn help<F>(mut self, f: F) -> Self
    where
        F: FnOnce(HelpConfigBuilder) -> HelpConfigBuilder,
    {
        self.help_config = Some(f(HelpConfigBuilder::new()).build());
        self
    }

    /// Configure environment variable parsing.
    pub fn env<F>(mut self, f: F) -> Self
    where
        F: FnOnce(EnvConfigBuilder) -> EnvConfigBuilder,
    {
        self.env_config = Some(f(EnvConfigBuilder::new()).build());
        self
    }

    /// Configure config file parsing.
    pub fn file<F>(mut self, f: F) -> Self
    where
        F: FnOnce(FileConfigBuilder) -> FileConfigBuilder,
    {
        self.file_config = Some(f(FileConfigBuilder::new()).build());
        self
    }

    /// Finalize the builder and return a Config for use with the Driver.
    pub fn build(self) -> Config {
        Config {
            schema: self.schema,
            cli_config: self.cli_config,
            help_config: self.help_config,
            env_config: self.env_config,
            file_config: self.file_config,
        }
    }
}

// ============================================================================
// Help Configuration Builder
// ============================================================================

/// Builder for help configuration.
#[derive(Debug, Default)]
pub struct HelpConfigBuilder {
    config: HelpConfig,
}

impl HelpConfigBuilder {
    /// Create a new help config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the program name shown in help.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.config.program_name = Some(name.into());
        self
    }

    /// Set the program version shown by `--version`.
    ///
    /// Use `env!("CARGO_PKG_VERSION")` to capture your crate's version. If
    /// not set, `--version` will display "unknown".
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = Some(version.into());
        self
    }

    /// Set an additional description shown under the program name.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = Some(description.into());
        self
    }

    /// Set the text wrapping width (0 = no wrapping).
    pub fn width(mut self, width: usize) -> Self {
        self.config.width = width;
        self
    }

    fn build(self) -> HelpConfig {
        self.config
    }
}

// ============================================================================
// File Configuration Builder
// ============================================================================

/// Builder for file configuration.
#[derive(Default)]
pub struct FileConfigBuilder {
    config: FileConfig,
}

impl FileConfigBuilder {
    /// Create a new file config builder.
    pub fn new() -> Self {
        Self {
            config: FileConfig::default(),
        }
    }

    /// Set an explicit config file path. This wins over a path supplied via
    /// the config-path parameter and over the default search paths.
    pub fn path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.config.explicit_path = Some(path.into());
        self
    }

    /// Set default paths to check for config files.
    ///
    /// These are checked in order; the first existing file is used.
    pub fn default_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.config.default_paths = paths.into_iter().map(|p| p.into()).collect();
        self
    }

    /// Register an additional config file format.
    pub fn format<F: ConfigFormat + 'static>(mut self, format: F) -> Self {
        self.config.registry.register(format);
        self
    }

    /// Enable strict mode - error on unknown keys in the config file.
    pub fn strict(mut self) -> Self {
        self.config.strict = true;
        self
    }

    /// Set inline content for testing (avoids disk I/O).
    ///
    /// The filename is used for format detection (e.g. "app.conf" or
    /// "settings.toml").
    pub fn content(mut self, content: impl Into<String>, filename: impl Into<String>) -> Self {
        self.config.inline_content = Some((content.into(), filename.into()));
        self
    }

    fn build(self) -> FileConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSpec, ValueKind};

    fn schema() -> Schema {
        Schema::builder()
            .param(ParamSpec::new("port", ValueKind::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn test_cli_config_builder() {
        let config = CliConfigBuilder::new()
            .args(["--port", "8080"])
            .strict()
            .build();

        assert_eq!(config.args(), &["--port", "8080"]);
        assert!(config.strict());
    }

    #[test]
    fn test_env_config_builder() {
        let config = EnvConfigBuilder::new().prefix("MYAPP").strict().build();

        assert_eq!(config.prefix, "MYAPP");
        assert!(config.strict);
    }

    #[test]
    fn test_file_config_builder() {
        let config = FileConfigBuilder::new()
            .path("app.conf")
            .default_paths(["./app.conf", "/etc/app/app.conf"])
            .strict()
            .build();

        assert_eq!(config.explicit_path, Some(Utf8PathBuf::from("app.conf")));
        assert_eq!(config.default_paths.len(), 2);
        assert!(config.strict);
    }

    #[test]
    fn test_config_builder_assembles_layers() {
        let config = builder(schema())
            .cli(|c| c.args(["--port", "1"]))
            .env(|e| e.prefix("APP"))
            .file(|f| f.content("", "app.conf"))
            .help(|h| h.program_name("app").version("1.0.0"))
            .build();

        assert!(config.cli_config.is_some());
        assert!(config.env_config.is_some());
        assert!(config.file_config.is_some());
        assert_eq!(
            config.help_config.as_ref().unwrap().program_name.as_deref(),
            Some("app")
        );
    }
}
