//! Row presentation: typed rows to display strings

use itertools::Itertools;

use super::ordering::TableEntry;
use super::types::{CorrelatedRow, EnrichedRecord, NOT_AVAILABLE};

/// Column headers for plain address lookups
pub const ENRICHED_HEADERS: [&str; 5] = ["ASN", "ORG", "IP", "Network", "Location"];

/// Column headers when rows carry hostname resolution data
pub const RESOLVED_HEADERS: [&str; 8] = [
    "Host", "A", "CNAME", "ASN", "ORG", "IP", "Network", "Location",
];

pub fn headers(resolved: bool) -> Vec<&'static str> {
    if resolved {
        RESOLVED_HEADERS.to_vec()
    } else {
        ENRICHED_HEADERS.to_vec()
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn join_or_na(values: &[String]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.iter().join("\n")
    }
}

/// ASN, ORG, IP, Network, Location for an enriched record
fn enrichment_fields(record: &EnrichedRecord) -> Vec<String> {
    vec![
        or_na(record.asn_number().map(|n| n.to_string())),
        or_na(record.organization().map(str::to_string)),
        record.ip.clone(),
        record.network_notation(),
        record.location_line(),
    ]
}

/// Display strings of one row, in header order
pub fn present_row(row: &CorrelatedRow) -> Vec<String> {
    match row {
        CorrelatedRow::Enriched(record) => enrichment_fields(record),
        CorrelatedRow::Resolved {
            resolution,
            ip,
            enrichment,
        } => {
            let mut fields = vec![
                resolution.host.clone(),
                join_or_na(&resolution.a),
                join_or_na(&resolution.cname),
            ];
            match enrichment {
                Some(record) => fields.extend(enrichment_fields(record)),
                None => fields.extend([
                    NOT_AVAILABLE.to_string(),
                    NOT_AVAILABLE.to_string(),
                    ip.clone(),
                    NOT_AVAILABLE.to_string(),
                    NOT_AVAILABLE.to_string(),
                ]),
            }
            fields
        }
    }
}

/// Present every row, passing separators through untouched
pub fn present(entries: &[TableEntry<CorrelatedRow>]) -> Vec<TableEntry<Vec<String>>> {
    entries
        .iter()
        .map(|entry| match entry {
            TableEntry::Row(row) => TableEntry::Row(present_row(row)),
            TableEntry::Separator => TableEntry::Separator,
        })
        .collect()
}
