//! IP lens arguments

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Arguments for annotating a list of addresses or hostnames
///
/// Usable from the CLI (clap derive under the `cli` feature) or built in
/// code / deserialized from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct IpLookupArgs {
    /// Input file with one IP address per line (one hostname per line with
    /// --resolve). Reads stdin when omitted or "-". Compressed and remote
    /// files are supported.
    #[cfg_attr(feature = "cli", clap(value_name = "FILE"))]
    pub input: Option<String>,

    /// Treat input lines as hostnames: resolve them with dnsx and annotate
    /// every A record
    #[cfg_attr(feature = "cli", clap(short, long))]
    #[serde(default)]
    pub resolve: bool,

    /// Do not draw separators between ASN groups
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub no_group: bool,
}

impl IpLookupArgs {
    /// Read from the given file
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..Default::default()
        }
    }

    /// Read from stdin
    pub fn stdin() -> Self {
        Self::default()
    }

    pub fn with_resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn with_grouping(mut self, grouped: bool) -> Self {
        self.no_group = !grouped;
        self
    }

    pub fn grouped(&self) -> bool {
        !self.no_group
    }

    /// Read all input lines, trimmed, without empty lines
    pub fn read_lines(&self) -> Result<Vec<String>> {
        let lines: Vec<String> = match self.input.as_deref() {
            None | Some("-") => std::io::stdin()
                .lock()
                .lines()
                .collect::<std::io::Result<_>>()
                .map_err(|e| anyhow!("Unable to read stdin: {}", e))?,
            Some(path) => oneio::read_lines(path)
                .map_err(|e| anyhow!("Unable to read input file {}: {}", path, e))?
                .collect::<std::io::Result<_>>()
                .map_err(|e| anyhow!("Unable to read input file {}: {}", path, e))?,
        };

        Ok(lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_lines_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ips.txt");
        std::fs::write(&path, "8.8.8.8\n\n  1.1.1.1  \n192.168.1.1\n").unwrap();

        let args = IpLookupArgs::new(path.to_str().unwrap());
        let lines = args.read_lines().unwrap();
        assert_eq!(lines, vec!["8.8.8.8", "1.1.1.1", "192.168.1.1"]);
    }

    #[test]
    fn test_read_lines_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = IpLookupArgs::new(dir.path().join("missing.txt").to_str().unwrap());
        assert!(args.read_lines().is_err());
    }

    #[test]
    fn test_builders() {
        let args = IpLookupArgs::stdin().with_resolve(true).with_grouping(false);
        assert!(args.input.is_none());
        assert!(args.resolve);
        assert!(!args.grouped());
    }
}
