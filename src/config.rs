use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::database::{GEOLITE_ASN_FILE, GEOLITE_CITY_FILE};
use crate::datasets::ResolverBinary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpmetaConfig {
    /// Directory holding the GeoLite2 databases
    pub data_dir: String,

    /// Path to the GeoLite2 ASN database
    pub asn_db_path: String,

    /// Path to the GeoLite2 City database
    pub city_db_path: String,

    /// Explicit path to the dnsx binary; discovered from GOPATH / PATH when unset
    pub dnsx_path: Option<String>,

    /// Resolver timeout in seconds (0 disables the timeout)
    pub resolver_timeout_secs: u64,
}

const EMPTY_CONFIG: &str = r#"### ipmeta configuration file

### directory holding GeoLite2-ASN.mmdb and GeoLite2-City.mmdb
# data_dir = "~/.ipmeta"

### override individual database files
# asn_db_path = "~/.ipmeta/GeoLite2-ASN.mmdb"
# city_db_path = "~/.ipmeta/GeoLite2-City.mmdb"

### dnsx binary used by --resolve (default: $GOPATH/bin/dnsx, then PATH)
# dnsx_path = "/usr/local/bin/dnsx"

### kill dnsx after this many seconds (0 = wait forever)
# resolver_timeout_secs = 0
"#;

fn home_dir() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("{}{}", home_dir(), rest),
        _ => path.to_string(),
    }
}

impl Default for IpmetaConfig {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}

impl IpmetaConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Sources, lowest priority first: the TOML file (`path`, or
    /// `$HOME/.ipmeta/ipmeta.toml`), then `IPMETA_*` environment variables.
    /// A missing file is created with a commented template.
    pub fn new(path: &Option<String>) -> Result<IpmetaConfig> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let ipmeta_dir = format!("{}/.ipmeta", home_dir());
                std::fs::create_dir_all(ipmeta_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create ipmeta directory: {}", e))?;
                let p = format!("{}/ipmeta.toml", ipmeta_dir);
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // E.g., `IPMETA_DATA_DIR=/srv/geoip ipmeta lookup ips.txt`
        builder = builder.add_source(config::Environment::with_prefix("IPMETA"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_map(&config))
    }

    /// Build a configuration from raw key/value settings, filling defaults
    fn from_map(config: &HashMap<String, String>) -> Self {
        let data_dir = config
            .get("data_dir")
            .map(|p| expand_home(p))
            .unwrap_or_else(|| format!("{}/.ipmeta", home_dir()));
        let data_dir = data_dir.trim_end_matches('/').to_string();

        let asn_db_path = config
            .get("asn_db_path")
            .map(|p| expand_home(p))
            .unwrap_or_else(|| format!("{}/{}", data_dir, GEOLITE_ASN_FILE));

        let city_db_path = config
            .get("city_db_path")
            .map(|p| expand_home(p))
            .unwrap_or_else(|| format!("{}/{}", data_dir, GEOLITE_CITY_FILE));

        let dnsx_path = config
            .get("dnsx_path")
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_home(p));

        let resolver_timeout_secs = config
            .get("resolver_timeout_secs")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        IpmetaConfig {
            data_dir,
            asn_db_path,
            city_db_path,
            dnsx_path,
            resolver_timeout_secs,
        }
    }

    /// Resolver timeout, `None` when disabled
    pub fn resolver_timeout(&self) -> Option<Duration> {
        match self.resolver_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// How the dnsx binary is located
    pub fn resolver_binary(&self) -> ResolverBinary {
        match &self.dnsx_path {
            Some(p) => ResolverBinary::Path(p.into()),
            None => ResolverBinary::from_env(),
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let status = |p: &str| {
            if Path::new(p).exists() {
                "found"
            } else {
                "missing"
            }
        };

        let dnsx = match self.resolver_binary().locate() {
            Ok(p) => p.display().to_string(),
            Err(_) => "not found".to_string(),
        };

        let timeout = match self.resolver_timeout_secs {
            0 => "none".to_string(),
            secs => format!("{} seconds", secs),
        };

        [
            format!("Data Directory:     {}", self.data_dir),
            format!(
                "ASN Database:       {} ({})",
                self.asn_db_path,
                status(&self.asn_db_path)
            ),
            format!(
                "City Database:      {} ({})",
                self.city_db_path,
                status(&self.city_db_path)
            ),
            format!("dnsx Binary:        {}", dnsx),
            format!("Resolver Timeout:   {}", timeout),
        ]
        .join("\n")
    }

    /// Get the default config file path
    pub fn config_file_path() -> String {
        format!("{}/.ipmeta/ipmeta.toml", home_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_data_dir() {
        let mut map = HashMap::new();
        map.insert("data_dir".to_string(), "/srv/geoip/".to_string());
        let config = IpmetaConfig::from_map(&map);

        assert_eq!(config.data_dir, "/srv/geoip");
        assert_eq!(config.asn_db_path, "/srv/geoip/GeoLite2-ASN.mmdb");
        assert_eq!(config.city_db_path, "/srv/geoip/GeoLite2-City.mmdb");
        assert_eq!(config.dnsx_path, None);
        assert_eq!(config.resolver_timeout(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipmeta.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/data"
city_db_path = "/other/City.mmdb"
dnsx_path = "/opt/go/bin/dnsx"
resolver_timeout_secs = 30
"#,
        )
        .unwrap();

        let config = IpmetaConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        assert_eq!(config.asn_db_path, "/data/GeoLite2-ASN.mmdb");
        assert_eq!(config.city_db_path, "/other/City.mmdb");
        assert_eq!(
            config.resolver_binary(),
            ResolverBinary::Path("/opt/go/bin/dnsx".into())
        );
        assert_eq!(config.resolver_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.toml");

        IpmetaConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("### ipmeta configuration file"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        assert_eq!(expand_home("~user/x"), "~user/x");
        assert!(expand_home("~/x").ends_with("/x"));
        assert!(!expand_home("~/x").starts_with('~'));
    }

    #[test]
    fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = HashMap::new();
        map.insert(
            "data_dir".to_string(),
            dir.path().to_str().unwrap().to_string(),
        );
        map.insert("dnsx_path".to_string(), "/nonexistent/dnsx".to_string());
        let config = IpmetaConfig::from_map(&map);

        let summary = config.summary();
        assert!(summary.contains("GeoLite2-ASN.mmdb (missing)"));
        assert!(summary.contains("dnsx Binary:        not found"));
        assert!(summary.contains("Resolver Timeout:   none"));
    }
}
