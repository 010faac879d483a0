//! GeoLite2 prefix databases
//!
//! Read-only access to the MaxMind GeoLite2 ASN and City databases. Both files
//! are memory-loaded once per pipeline run and queried by longest-prefix match.
//!
//! The lookup surface is the [`PrefixLookup`] trait so that lenses can be
//! exercised against an in-memory table instead of real `.mmdb` files.

use anyhow::{anyhow, Result};
use maxminddb::Reader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Default file name of the GeoLite2 ASN database
pub const GEOLITE_ASN_FILE: &str = "GeoLite2-ASN.mmdb";

/// Default file name of the GeoLite2 City database
pub const GEOLITE_CITY_FILE: &str = "GeoLite2-City.mmdb";

// =============================================================================
// Records
// =============================================================================

/// Autonomous system that announces the prefix covering an address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutonomousSystemInfo {
    /// Autonomous System Number
    pub number: Option<u32>,
    /// Organization operating the AS
    pub organization: Option<String>,
}

/// A geographic entity (city, country, continent, subdivision) with its
/// localized names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedPlace {
    pub geoname_id: Option<u32>,
    /// ISO code; continents carry a two-letter `code` instead
    #[serde(alias = "code")]
    pub iso_code: Option<String>,
    /// Localized names keyed by language tag (`en`, `de`, ...)
    pub names: BTreeMap<String, String>,
}

impl NamedPlace {
    /// Name in the given language, if the database has one
    pub fn name(&self, lang: &str) -> Option<&str> {
        self.names.get(lang).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Postal {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_radius: Option<u16>,
    pub time_zone: Option<String>,
}

/// Geolocation data for an address. Every field is optional and its presence
/// varies per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub country: Option<NamedPlace>,
    pub city: Option<NamedPlace>,
    pub continent: Option<NamedPlace>,
    pub registered_country: Option<NamedPlace>,
    pub subdivisions: Vec<NamedPlace>,
    pub postal: Option<Postal>,
    pub location: Option<Coordinates>,
}

impl GeoInfo {
    /// English city name
    pub fn city_name(&self) -> Option<&str> {
        self.city.as_ref().and_then(|c| c.name("en"))
    }

    /// English country name
    pub fn country_name(&self) -> Option<&str> {
        self.country.as_ref().and_then(|c| c.name("en"))
    }
}

/// Raw layout of a GeoLite2-ASN record
#[derive(Debug, Deserialize)]
struct AsnEntry {
    autonomous_system_number: Option<u32>,
    autonomous_system_organization: Option<String>,
}

impl From<AsnEntry> for AutonomousSystemInfo {
    fn from(entry: AsnEntry) -> Self {
        AutonomousSystemInfo {
            number: entry.autonomous_system_number,
            organization: entry.autonomous_system_organization,
        }
    }
}

// =============================================================================
// Lookup trait
// =============================================================================

/// Longest-prefix-match lookups against an ASN store and a geolocation store
pub trait PrefixLookup {
    /// Look up the AS announcing `ip`.
    ///
    /// Returns the record (if any) and the prefix length of the matched
    /// network. The prefix length is reported by the store even when the
    /// matched network carries no data.
    fn lookup_asn(&self, ip: IpAddr) -> Result<(Option<AutonomousSystemInfo>, Option<u8>)>;

    /// Look up geolocation data for `ip`
    fn lookup_geo(&self, ip: IpAddr) -> Result<Option<GeoInfo>>;
}

// =============================================================================
// GeoLite2 database pair
// =============================================================================

/// The GeoLite2 ASN and City databases, opened together for one run
pub struct GeoliteDatabase {
    asn: Reader<Vec<u8>>,
    city: Reader<Vec<u8>>,
}

impl GeoliteDatabase {
    /// Open both databases. Missing or unreadable files are fatal.
    pub fn open(asn_path: impl AsRef<Path>, city_path: impl AsRef<Path>) -> Result<Self> {
        let asn_path = asn_path.as_ref();
        let city_path = city_path.as_ref();

        let asn = Reader::open_readfile(asn_path).map_err(|e| {
            anyhow!(
                "Unable to open ASN database {}: {}",
                asn_path.display(),
                e
            )
        })?;
        let city = Reader::open_readfile(city_path).map_err(|e| {
            anyhow!(
                "Unable to open City database {}: {}",
                city_path.display(),
                e
            )
        })?;

        debug!(
            "opened GeoLite2 databases: asn={} ({}), city={} ({})",
            asn_path.display(),
            asn.metadata.database_type,
            city_path.display(),
            city.metadata.database_type
        );

        Ok(Self { asn, city })
    }

    /// Open both databases by their default file names inside `dir`
    pub fn open_in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::open(dir.join(GEOLITE_ASN_FILE), dir.join(GEOLITE_CITY_FILE))
    }
}

impl PrefixLookup for GeoliteDatabase {
    fn lookup_asn(&self, ip: IpAddr) -> Result<(Option<AutonomousSystemInfo>, Option<u8>)> {
        let (entry, prefix_len) = self
            .asn
            .lookup_prefix::<AsnEntry>(ip)
            .map_err(|e| anyhow!("ASN lookup failed for {}: {}", ip, e))?;
        let prefix_len = u8::try_from(prefix_len).ok();
        Ok((entry.map(AutonomousSystemInfo::from), prefix_len))
    }

    fn lookup_geo(&self, ip: IpAddr) -> Result<Option<GeoInfo>> {
        self.city
            .lookup::<GeoInfo>(ip)
            .map_err(|e| anyhow!("City lookup failed for {}: {}", ip, e))
    }
}
