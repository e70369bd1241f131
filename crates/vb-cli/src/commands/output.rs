//! Output formatting for built requests and submission results

use clap::ValueEnum;
use serde::Serialize;

use crate::Result;

/// Structured output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON
    Json,
    /// YAML
    Yaml,
}

/// Render a resource in the requested format
pub fn render<T: Serialize>(resource: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(resource)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(resource)?),
    }
}

/// Human-readable confirmation printed after a successful submission
pub fn confirmation(backup_name: &str) -> String {
    format!(
        "Backup request \"{name}\" submitted successfully.\n\
         Run `velero backup describe {name}` or `velero backup logs {name}` for more details.",
        name = backup_name
    )
}
