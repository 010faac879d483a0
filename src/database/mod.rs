//! Database module
//!
//! Read-only prefix databases used for enrichment:
//!
//! ```text
//! database/
//! └── geolite     # GeoLite2 ASN + City (.mmdb), longest-prefix match
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ipmeta::database::{GeoliteDatabase, PrefixLookup};
//!
//! let db = GeoliteDatabase::open("GeoLite2-ASN.mmdb", "GeoLite2-City.mmdb")?;
//! let (asn, prefix_len) = db.lookup_asn("1.1.1.1".parse()?)?;
//! ```

pub mod geolite;

pub use geolite::{
    AutonomousSystemInfo, Coordinates, GeoInfo, GeoliteDatabase, NamedPlace, Postal,
    PrefixLookup, GEOLITE_ASN_FILE, GEOLITE_CITY_FILE,
};
