//! Common utilities for lens modules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unified output format for all ipmeta commands
///
/// `table` draws ASN group separators as rules and `psv` as empty lines; the
/// other formats emit the same ordered rows without them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Table with box-drawing borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON array
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// JSON Lines format (one JSON object per line)
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Whether group separators are rendered
    pub fn shows_groups(&self) -> bool {
        matches!(self, Self::Table | Self::Psv)
    }

    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "json-line", "psv"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::JsonLine => "json-line",
            Self::Psv => "psv",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonline" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}
