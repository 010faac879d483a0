//! IP annotation lens
//!
//! This module annotates IP addresses with ASN and geolocation data from the
//! GeoLite2 databases, optionally starting from hostnames resolved through
//! `dnsx`, and orders the results into ASN groups for display.
//!
//! Pipeline:
//!
//! ```text
//! lines ─► is_routable ─► lookup (ASN + City) ─► EnrichedRecord ─┐
//!                                                                ├─► order ─► present ─► render
//! hosts ─► BatchResolver ─► correlate (one row per A record) ────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ipmeta::database::GeoliteDatabase;
//! use ipmeta::lens::ip::IpLens;
//!
//! let db = GeoliteDatabase::open_in_dir("~/.ipmeta")?;
//! let lens = IpLens::new(&db);
//!
//! let report = lens.annotate_addresses(&["8.8.8.8", "1.1.1.1"], true);
//! for warning in &report.warnings {
//!     eprintln!("WARNING: {}", warning);
//! }
//! println!("{}", lens.format_report(&report, OutputFormat::Table)?);
//! ```

mod args;
mod correlate;
mod ordering;
mod present;
#[cfg(feature = "display")]
mod render;
mod types;
mod validate;

pub use args::IpLookupArgs;
pub use correlate::correlate;
pub use ordering::{
    asn_group_key, group_by_key, order, record_sort_key, sort_key, sort_rows, SortKey, TableEntry,
};
pub use present::{headers, present, present_row, ENRICHED_HEADERS, RESOLVED_HEADERS};
#[cfg(feature = "display")]
pub use render::render_rows;
pub use types::{
    ip_to_int, network_address, CorrelatedRow, EnrichedRecord, LookupWarning, NOT_AVAILABLE,
};
pub use validate::{is_private, is_reserved, is_routable, is_routable_addr};

use anyhow::Result;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::database::PrefixLookup;
use crate::datasets::BatchResolver;
#[cfg(feature = "display")]
use crate::lens::utils::OutputFormat;

/// Ordered rows plus the lookup misses collected along the way
#[derive(Debug, Clone, Default)]
pub struct IpReport {
    pub entries: Vec<TableEntry<CorrelatedRow>>,
    pub warnings: Vec<LookupWarning>,
    /// Rows carry hostname resolution data
    pub resolved: bool,
}

impl IpReport {
    pub fn rows(&self) -> impl Iterator<Item = &CorrelatedRow> {
        self.entries.iter().filter_map(TableEntry::row)
    }

    pub fn separator_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_separator()).count()
    }
}

/// IP annotation lens
///
/// Wraps a [`PrefixLookup`] store and runs the validate → enrich → (correlate)
/// → order pipeline on top of it.
pub struct IpLens<'a> {
    db: &'a dyn PrefixLookup,
}

impl<'a> IpLens<'a> {
    pub fn new(db: &'a dyn PrefixLookup) -> Self {
        Self { db }
    }

    /// Look up one address in both stores.
    ///
    /// Store errors are treated as misses. A missing ASN record comes back
    /// with a [`LookupWarning::AsnNotFound`].
    pub fn lookup(&self, ip: IpAddr) -> (EnrichedRecord, Option<LookupWarning>) {
        let (asn, prefix_len) = self.db.lookup_asn(ip).unwrap_or_else(|e| {
            warn!("{}", e);
            (None, None)
        });
        let geo = self.db.lookup_geo(ip).unwrap_or_else(|e| {
            warn!("{}", e);
            None
        });

        let warning = match asn {
            Some(_) => None,
            None => Some(LookupWarning::AsnNotFound(ip.to_string())),
        };

        let record = EnrichedRecord {
            ip: ip.to_string(),
            asn,
            geo,
            prefix_len,
        };
        (record, warning)
    }

    /// Validate and look up one raw input string; non-routable input yields
    /// `None`
    pub fn enrich(&self, raw: &str) -> Option<(EnrichedRecord, Option<LookupWarning>)> {
        let raw = raw.trim();
        if !is_routable(raw) {
            debug!("skipping non-routable input {:?}", raw);
            return None;
        }
        let ip = raw.parse::<IpAddr>().ok()?;
        Some(self.lookup(ip))
    }

    /// Enrich every routable address of `lines`, in input order
    pub fn enrich_all<S: AsRef<str>>(&self, lines: &[S]) -> (Vec<EnrichedRecord>, Vec<LookupWarning>) {
        let mut records = vec![];
        let mut warnings = vec![];
        for line in lines {
            if let Some((record, warning)) = self.enrich(line.as_ref()) {
                records.push(record);
                warnings.extend(warning);
            }
        }
        (records, warnings)
    }

    /// Annotate a list of IP addresses
    pub fn annotate_addresses<S: AsRef<str>>(&self, lines: &[S], grouped: bool) -> IpReport {
        let (records, warnings) = self.enrich_all(lines);
        info!(
            "enriched {} of {} input lines",
            records.len(),
            lines.len()
        );

        let rows = records.into_iter().map(CorrelatedRow::Enriched).collect();
        IpReport {
            entries: order(rows, grouped),
            warnings,
            resolved: false,
        }
    }

    /// Resolve hostnames and annotate every A record
    ///
    /// Each distinct A-record address is looked up once. Resolver failures are
    /// propagated; per-address misses become warnings.
    pub fn annotate_hosts(
        &self,
        hosts: &[String],
        resolver: &dyn BatchResolver,
        grouped: bool,
    ) -> Result<IpReport> {
        let records = resolver.resolve(hosts)?;

        let mut enrichment_by_ip: HashMap<String, EnrichedRecord> = HashMap::new();
        let mut warnings = vec![];
        for ip in records.iter().flat_map(|r| r.a.iter()) {
            if enrichment_by_ip.contains_key(ip) {
                continue;
            }
            if let Some((record, warning)) = self.enrich(ip) {
                warnings.extend(warning);
                enrichment_by_ip.insert(ip.clone(), record);
            }
        }

        let (rows, misses) = correlate(&records, &enrichment_by_ip);
        warnings.extend(misses);
        info!(
            "resolved {} of {} hosts into {} rows",
            records.len(),
            hosts.len(),
            rows.len()
        );

        Ok(IpReport {
            entries: order(rows, grouped),
            warnings,
            resolved: true,
        })
    }

    /// Run the pipeline described by `args` on already-read input lines
    pub fn annotate(
        &self,
        args: &IpLookupArgs,
        lines: &[String],
        resolver: Option<&dyn BatchResolver>,
    ) -> Result<IpReport> {
        match (args.resolve, resolver) {
            (true, Some(resolver)) => self.annotate_hosts(lines, resolver, args.grouped()),
            (true, None) => Err(anyhow::anyhow!("hostname resolution requires a resolver")),
            (false, _) => Ok(self.annotate_addresses(lines, args.grouped())),
        }
    }

    /// Format a report for display
    #[cfg(feature = "display")]
    pub fn format_report(&self, report: &IpReport, format: OutputFormat) -> Result<String> {
        let rows: Vec<&CorrelatedRow> = report.rows().collect();
        let output = match format {
            OutputFormat::Json => serde_json::to_string(&rows)?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&rows)?,
            OutputFormat::JsonLine => rows
                .iter()
                .map(serde_json::to_string)
                .collect::<serde_json::Result<Vec<_>>>()?
                .join("\n"),
            _ => {
                let headers = headers(report.resolved);
                render_rows(&headers, &present(&report.entries), format)
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AutonomousSystemInfo, GeoInfo};
    use crate::datasets::ResolutionRecord;
    use std::cell::RefCell;

    /// In-memory store: exact-address ASN table with a fixed prefix length
    struct FakeDb {
        asns: HashMap<IpAddr, (u32, &'static str, u8)>,
        queried: RefCell<Vec<IpAddr>>,
    }

    impl FakeDb {
        fn new() -> Self {
            let mut asns = HashMap::new();
            asns.insert("8.8.8.8".parse().unwrap(), (15169, "GOOGLE", 24));
            asns.insert("8.8.4.4".parse().unwrap(), (15169, "GOOGLE", 24));
            asns.insert("1.1.1.1".parse().unwrap(), (13335, "CLOUDFLARENET", 24));
            Self {
                asns,
                queried: RefCell::new(vec![]),
            }
        }
    }

    impl PrefixLookup for FakeDb {
        fn lookup_asn(&self, ip: IpAddr) -> Result<(Option<AutonomousSystemInfo>, Option<u8>)> {
            self.queried.borrow_mut().push(ip);
            Ok(match self.asns.get(&ip) {
                Some((asn, org, len)) => (
                    Some(AutonomousSystemInfo {
                        number: Some(*asn),
                        organization: Some(org.to_string()),
                    }),
                    Some(*len),
                ),
                None => (None, Some(8)),
            })
        }

        fn lookup_geo(&self, ip: IpAddr) -> Result<Option<GeoInfo>> {
            if ip.to_string() == "9.9.9.9" {
                anyhow::bail!("corrupt record");
            }
            Ok(None)
        }
    }

    struct FakeResolver(Vec<ResolutionRecord>);

    impl BatchResolver for FakeResolver {
        fn resolve(&self, hosts: &[String]) -> Result<Vec<ResolutionRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|r| hosts.contains(&r.host))
                .cloned()
                .collect())
        }
    }

    fn host(name: &str, a: &[&str]) -> ResolutionRecord {
        ResolutionRecord {
            host: name.to_string(),
            a: a.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_annotate_addresses() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);

        let report = lens.annotate_addresses(&["8.8.8.8", "1.1.1.1", "192.168.1.1"], true);
        let ips: Vec<&str> = report.rows().map(|r| r.ip()).collect();
        assert_eq!(ips, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(report.separator_count(), 1);
        assert!(report.warnings.is_empty());
        assert!(matches!(report.entries[1], TableEntry::Separator));
        // private address never reaches the database
        assert_eq!(db.queried.borrow().len(), 2);
    }

    #[test]
    fn test_missing_asn() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);

        let report = lens.annotate_addresses(&["8.8.8.8", "5.6.7.8"], true);
        assert_eq!(
            report.warnings,
            vec![LookupWarning::AsnNotFound("5.6.7.8".to_string())]
        );

        let first = report.rows().next().unwrap();
        assert_eq!(first.ip(), "5.6.7.8");
        assert_eq!(sort_key(first), (0, 0x05000000, 0x05060708));
        assert_eq!(&present_row(first)[..2], &["N/A", "N/A"]);
    }

    #[test]
    fn test_store_error_is_a_miss() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);
        let (record, warning) = lens.lookup("9.9.9.9".parse().unwrap());
        assert!(record.geo.is_none());
        assert!(warning.is_some());
    }

    #[test]
    fn test_annotate_hosts() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);
        let resolver = FakeResolver(vec![
            host("example.com", &["8.8.8.8", "8.8.8.8"]),
            host("cf.example", &["1.1.1.1"]),
            host("intranet.example", &["10.1.1.1"]),
            host("empty.example", &[]),
        ]);
        let hosts: Vec<String> = [
            "example.com",
            "cf.example",
            "intranet.example",
            "empty.example",
            "silent.example",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let report = lens.annotate_hosts(&hosts, &resolver, true).unwrap();
        assert!(report.resolved);
        assert_eq!(report.rows().count(), 4);

        // duplicate A records are looked up once but kept as two rows
        assert_eq!(
            db.queried
                .borrow()
                .iter()
                .filter(|ip| ip.to_string() == "8.8.8.8")
                .count(),
            1
        );
        let google: Vec<&CorrelatedRow> = report
            .rows()
            .filter(|r| r.ip() == "8.8.8.8")
            .collect();
        assert_eq!(google.len(), 2);
        assert_eq!(google[0].enrichment(), google[1].enrichment());

        assert_eq!(
            report.warnings,
            vec![LookupWarning::NotEnriched("10.1.1.1".to_string())]
        );

        // groups: [unenriched 10.1.1.1] | [13335] | [15169 x2]
        let ips: Vec<&str> = report
            .entries
            .iter()
            .map(|e| e.row().map(|r| r.ip()).unwrap_or("--"))
            .collect();
        assert_eq!(
            ips,
            vec!["10.1.1.1", "--", "1.1.1.1", "--", "8.8.8.8", "8.8.8.8"]
        );
    }

    #[test]
    fn test_annotate_requires_resolver() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);
        let args = IpLookupArgs::stdin().with_resolve(true);
        assert!(lens.annotate(&args, &["example.com".to_string()], None).is_err());

        let args = IpLookupArgs::stdin();
        let report = lens.annotate(&args, &["8.8.8.8".to_string()], None).unwrap();
        assert_eq!(report.rows().count(), 1);
    }

    #[cfg(feature = "display")]
    #[test]
    fn test_format_report() {
        let db = FakeDb::new();
        let lens = IpLens::new(&db);
        let report = lens.annotate_addresses(&["8.8.8.8", "1.1.1.1"], true);

        let table = lens.format_report(&report, OutputFormat::Table).unwrap();
        assert!(table.contains("CLOUDFLARENET"));
        assert!(table.contains("8.8.8.0/24"));
        assert!(table.contains("Location"));

        let json = lens.format_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
        assert_eq!(value[0]["ip"], "1.1.1.1");
        assert_eq!(value[0]["asn"]["number"], 13335);

        let lines = lens.format_report(&report, OutputFormat::JsonLine).unwrap();
        assert_eq!(lines.lines().count(), 2);
    }
}
