//! Provenance tracking for layered configuration.
//!
//! Every candidate value remembers which source produced it, enabling rich
//! error messages, override reporting, and the provenance dump.

use std::string::String;
use std::sync::Arc;
use std::vec::Vec;

use camino::Utf8PathBuf;

/// Information about a loaded config file.
///
/// Reference-counted so it can be shared across all values that originated
/// from the same file without duplicating the path and contents.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Path to the config file (UTF-8).
    pub path: Utf8PathBuf,
    /// Full contents of the file (kept for error reporting with ariadne).
    pub contents: String,
}

impl ConfigFile {
    /// Create a new ConfigFile from a path and contents.
    pub fn new(path: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// The origin of a configuration value.
#[derive(Debug, Clone, Default)]
pub enum Provenance {
    /// Value came from a CLI argument.
    Cli {
        /// The CLI argument string, e.g. "--port" or "-p".
        arg: String,
        /// The raw value provided, e.g. "8080".
        value: String,
    },

    /// Value came from an environment variable.
    Env {
        /// The environment variable name, e.g. "APP_PORT".
        var: String,
        /// The raw value from the environment.
        value: String,
    },

    /// Value came from a config file.
    File {
        /// The config file (shared reference).
        file: Arc<ConfigFile>,
        /// The key within the file, e.g. "port" or "server.port".
        key: String,
        /// Byte offset in the file where the value starts.
        offset: usize,
        /// Length in bytes of the value in the source.
        len: usize,
    },

    /// Value came from the parameter's declared default.
    #[default]
    Default,
}

impl Provenance {
    /// Create a CLI provenance.
    pub fn cli(arg: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Cli {
            arg: arg.into(),
            value: value.into(),
        }
    }

    /// Create an environment variable provenance.
    pub fn env(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            value: value.into(),
        }
    }

    /// Create a file provenance.
    pub fn file(file: Arc<ConfigFile>, key: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::File {
            file,
            key: key.into(),
            offset,
            len,
        }
    }

    /// Check if this provenance is from CLI.
    pub fn is_cli(&self) -> bool {
        matches!(self, Self::Cli { .. })
    }

    /// Check if this provenance is from environment.
    pub fn is_env(&self) -> bool {
        matches!(self, Self::Env { .. })
    }

    /// Check if this provenance is from a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Check if this provenance is a default value.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Get the priority of this provenance source.
    ///
    /// Higher numbers mean higher priority:
    /// - CLI: 3 (highest)
    /// - Env: 2
    /// - File: 1
    /// - Default: 0 (lowest)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Cli { .. } => 3,
            Self::Env { .. } => 2,
            Self::File { .. } => 1,
            Self::Default => 0,
        }
    }

    /// Get a human-readable description of the source.
    pub fn source_description(&self) -> String {
        match self {
            Self::Cli { arg, .. } => format!("command line: {arg}"),
            Self::Env { var, .. } => format!("env: {var}"),
            Self::File { file, key, .. } => format!("{}: {key}", file.path),
            Self::Default => "default".into(),
        }
    }
}

impl core::fmt::Display for Provenance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cli { arg, .. } => write!(f, "from command-line argument {arg}"),
            Self::Env { var, .. } => write!(f, "from environment variable {var}"),
            Self::File { file, key, .. } => write!(f, "from {}: {key}", file.path),
            Self::Default => write!(f, "from default"),
        }
    }
}

/// A record of when a higher-priority layer overrode a lower-priority one.
#[derive(Debug, Clone)]
pub struct Override {
    /// The parameter that was overridden, e.g. "port".
    pub param: String,
    /// The winning provenance (higher priority).
    pub winner: Provenance,
    /// The losing provenance (lower priority, was overridden).
    pub loser: Provenance,
}

impl Override {
    /// Create a new override record.
    pub fn new(param: impl Into<String>, winner: Provenance, loser: Provenance) -> Self {
        Self {
            param: param.into(),
            winner,
            loser,
        }
    }
}

impl core::fmt::Display for Override {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}: {} overrides {}",
            self.param,
            self.winner.source_description(),
            self.loser.source_description()
        )
    }
}

/// Status of a config file path during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePathStatus {
    /// Path was picked and loaded.
    Picked,
    /// Path exists but was not tried (an explicit path was provided).
    NotTried,
    /// Path does not exist.
    Absent,
}

/// One config file path that was considered during resolution.
#[derive(Debug, Clone)]
pub struct FilePathResolution {
    /// The path that was checked.
    pub path: Utf8PathBuf,

    /// The status of this path.
    pub status: FilePathStatus,

    /// Whether this path was given explicitly (builder or config-path flag).
    pub explicit: bool,
}

/// Result of config file resolution, tracking all paths that were considered.
#[derive(Debug, Clone, Default)]
pub struct FileResolution {
    /// All paths that were considered, in order.
    pub paths: Vec<FilePathResolution>,

    /// Whether an explicit path was provided.
    pub had_explicit: bool,
}

impl FileResolution {
    /// Create a new empty file resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicit path.
    pub fn add_explicit(&mut self, path: Utf8PathBuf, exists: bool) {
        self.had_explicit = true;
        self.paths.push(FilePathResolution {
            path,
            status: if exists {
                FilePathStatus::Picked
            } else {
                FilePathStatus::Absent
            },
            explicit: true,
        });
    }

    /// Add a default search path that was checked.
    pub fn add_default(&mut self, path: Utf8PathBuf, status: FilePathStatus) {
        self.paths.push(FilePathResolution {
            path,
            status,
            explicit: false,
        });
    }

    /// Mark remaining default paths as not tried (because explicit was used).
    pub fn mark_defaults_not_tried(&mut self, default_paths: &[Utf8PathBuf]) {
        for path in default_paths {
            self.paths.push(FilePathResolution {
                path: path.clone(),
                status: FilePathStatus::NotTried,
                explicit: false,
            });
        }
    }

    /// The path that was actually loaded, if any.
    pub fn picked(&self) -> Option<&Utf8PathBuf> {
        self.paths
            .iter()
            .find(|p| p.status == FilePathStatus::Picked)
            .map(|p| &p.path)
    }
}
