#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! ipmeta - ASN and geolocation annotation for IP addresses
//!
//! ipmeta takes a list of IP addresses (or hostnames), annotates every public
//! address with its origin AS, matched network and location from the MaxMind
//! GeoLite2 databases, and prints the result ordered and grouped by ASN. It can
//! be used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Lookup pipeline, JSON output | `maxminddb`, `ipnet` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | CLI binary | All above + `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`database`]**: GeoLite2 ASN/City prefix databases behind the
//!   `PrefixLookup` trait
//! - **[`datasets`]**: external data sources; hostname resolution through
//!   `dnsx` behind the `BatchResolver` trait
//! - **[`lens`]**: the annotation pipeline (validate, enrich, correlate,
//!   order, present)
//! - **[`config`]**: configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ipmeta::database::GeoliteDatabase;
//! use ipmeta::datasets::{DnsxResolver, ResolverBinary};
//! use ipmeta::lens::ip::IpLens;
//!
//! let db = GeoliteDatabase::open_in_dir("/srv/geoip")?;
//! let lens = IpLens::new(&db);
//!
//! // plain addresses
//! let report = lens.annotate_addresses(&["8.8.8.8", "1.1.1.1"], true);
//!
//! // hostnames through dnsx
//! let resolver = DnsxResolver::new(&ResolverBinary::from_env())?;
//! let hosts = vec!["example.com".to_string()];
//! let report = lens.annotate_hosts(&hosts, &resolver, true)?;
//! for row in report.rows() {
//!     println!("{} {:?}", row.ip(), row.enrichment().and_then(|e| e.asn_number()));
//! }
//! ```

pub mod config;
pub mod database;
pub mod datasets;
pub mod lens;

pub use config::IpmetaConfig;

pub use database::{AutonomousSystemInfo, GeoInfo, GeoliteDatabase, PrefixLookup};

pub use datasets::{BatchResolver, DnsxResolver, ResolutionRecord, ResolverBinary};

pub use lens::ip::{CorrelatedRow, EnrichedRecord, IpLens, IpReport, LookupWarning, TableEntry};
pub use lens::utils::OutputFormat;
