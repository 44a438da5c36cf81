//! Provenance dump: where every resolved value came from.
//!
//! Groups the resolved parameter set under one heading per source, in
//! precedence order, so a user can see at a glance which layer supplied
//! each value:
//!
//! ```text
//! Command Line Args:
//!   --port:             8080
//! Environment Variables:
//!   APP_HOST:           example.com
//! Config File (app.conf):
//!   timeout:            30
//! Defaults:
//!   retries:            3
//! ```

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::provenance::{FileResolution, Provenance};
use crate::resolved::ResolvedParams;

/// Format the resolved values grouped by source.
pub fn format_values(params: &ResolvedParams, resolution: Option<&FileResolution>) -> String {
    let mut buffer = Vec::new();
    if write_values(&mut buffer, params, resolution).is_err() {
        return "error rendering values".to_string();
    }
    String::from_utf8(buffer).unwrap_or_else(|_| "error rendering values".to_string())
}

/// Write the resolved values grouped by source into any sink.
pub fn write_values<W: Write>(
    w: &mut W,
    params: &ResolvedParams,
    resolution: Option<&FileResolution>,
) -> io::Result<()> {
    let mut cli_lines = Vec::new();
    let mut env_lines = Vec::new();
    let mut file_lines = Vec::new();
    let mut default_lines = Vec::new();
    let mut file_path: Option<String> = None;

    for (name, param) in params.iter() {
        let value = param.value.to_string();
        match &param.provenance {
            Provenance::Cli { arg, .. } => {
                cli_lines.push(format_line(arg, &value));
            }
            Provenance::Env { var, .. } => {
                env_lines.push(format_line(var, &value));
            }
            Provenance::File { file, key, .. } => {
                file_path.get_or_insert_with(|| file.path.to_string());
                file_lines.push(format_line(key, &value));
            }
            Provenance::Default => {
                default_lines.push(format_line(name, &value));
            }
        }
    }

    if file_path.is_none() {
        file_path = resolution
            .and_then(FileResolution::picked)
            .map(|p| p.to_string());
    }

    if !cli_lines.is_empty() {
        writeln!(w, "{}", "Command Line Args:".bold())?;
        for line in cli_lines {
            writeln!(w, "{line}")?;
        }
    }
    if !env_lines.is_empty() {
        writeln!(w, "{}", "Environment Variables:".bold())?;
        for line in env_lines {
            writeln!(w, "{line}")?;
        }
    }
    if !file_lines.is_empty() {
        let heading = match file_path {
            Some(path) => format!("Config File ({path}):"),
            None => "Config File:".to_string(),
        };
        writeln!(w, "{}", heading.bold())?;
        for line in file_lines {
            writeln!(w, "{line}")?;
        }
    }
    if !default_lines.is_empty() {
        writeln!(w, "{}", "Defaults:".bold())?;
        for line in default_lines {
            writeln!(w, "{line}")?;
        }
    }

    Ok(())
}

/// Print the resolved values grouped by source to stdout.
pub fn print_values(params: &ResolvedParams, resolution: Option<&FileResolution>) {
    print!("{}", format_values(params, resolution));
}

fn format_line(label: &str, value: &str) -> String {
    format!("  {:<19}{value}", format!("{label}:"))
}
