//! Deterministic ordering and ASN grouping of table rows
//!
//! Rows are sorted by `(asn, network, ip)` and then split into groups of equal
//! ASN with [`TableEntry::Separator`] markers between neighbouring groups.

use serde::Serialize;
use std::net::IpAddr;

use super::types::{ip_to_int, CorrelatedRow, EnrichedRecord};

/// A row or a group boundary in an ordered table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableEntry<T> {
    Row(T),
    Separator,
}

impl<T> TableEntry<T> {
    pub fn is_separator(&self) -> bool {
        matches!(self, TableEntry::Separator)
    }

    pub fn row(&self) -> Option<&T> {
        match self {
            TableEntry::Row(row) => Some(row),
            TableEntry::Separator => None,
        }
    }
}

/// Sort key of a row: `(asn, network base, ip)`
pub type SortKey = (u32, u128, u128);

/// ASN used for grouping and ordering; absent ASNs count as 0
pub fn asn_group_key(record: Option<&EnrichedRecord>) -> u32 {
    record.and_then(|r| r.asn_number()).unwrap_or(0)
}

/// Sort key of an enriched record.
///
/// An unparsable address or prefix length degrades to `(asn, 0, 0)`.
pub fn record_sort_key(record: &EnrichedRecord) -> SortKey {
    let asn = asn_group_key(Some(record));
    let Ok(ip) = record.ip.parse::<IpAddr>() else {
        return (asn, 0, 0);
    };
    match record.network() {
        Ok(net) => (asn, ip_to_int(&net.network()), ip_to_int(&ip)),
        Err(_) => (asn, 0, 0),
    }
}

/// Sort key of a table row; rows without enrichment sort in the 0 group by
/// their own address
pub fn sort_key(row: &CorrelatedRow) -> SortKey {
    match row.enrichment() {
        Some(record) => record_sort_key(record),
        None => {
            let ip = row.ip().parse::<IpAddr>().map(|ip| ip_to_int(&ip));
            (0, 0, ip.unwrap_or(0))
        }
    }
}

/// Stable sort by [`sort_key`]; equal keys keep their input order
pub fn sort_rows(rows: &mut [CorrelatedRow]) {
    rows.sort_by_key(sort_key);
}

/// Wrap already-sorted rows into table entries, inserting a separator
/// wherever the group key changes between two consecutive rows
pub fn group_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<TableEntry<T>>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut entries = Vec::with_capacity(rows.len());
    let mut previous: Option<K> = None;

    for row in rows {
        let current = key(&row);
        if previous.as_ref().is_some_and(|p| *p != current) {
            entries.push(TableEntry::Separator);
        }
        previous = Some(current);
        entries.push(TableEntry::Row(row));
    }

    entries
}

/// Sort rows and split them into ASN groups
pub fn order(mut rows: Vec<CorrelatedRow>, grouped: bool) -> Vec<TableEntry<CorrelatedRow>> {
    sort_rows(&mut rows);
    if grouped {
        group_by_key(rows, |row| asn_group_key(row.enrichment()))
    } else {
        rows.into_iter().map(TableEntry::Row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AutonomousSystemInfo;
    use crate::datasets::ResolutionRecord;

    fn enriched(ip: &str, asn: Option<u32>, prefix_len: Option<u8>) -> CorrelatedRow {
        CorrelatedRow::Enriched(EnrichedRecord {
            ip: ip.to_string(),
            asn: asn.map(|n| AutonomousSystemInfo {
                number: Some(n),
                organization: None,
            }),
            geo: None,
            prefix_len,
        })
    }

    fn ips(entries: &[TableEntry<CorrelatedRow>]) -> Vec<&str> {
        entries
            .iter()
            .map(|e| match e {
                TableEntry::Row(r) => r.ip(),
                TableEntry::Separator => "--",
            })
            .collect()
    }

    #[test]
    fn test_sort_key() {
        assert_eq!(
            sort_key(&enriched("8.8.8.8", Some(15169), Some(24))),
            (15169, 0x08080800, 0x08080808)
        );
        // no prefix length: the network is the address itself
        assert_eq!(
            sort_key(&enriched("8.8.8.8", Some(15169), None)),
            (15169, 0x08080808, 0x08080808)
        );
        // no ASN
        assert_eq!(
            sort_key(&enriched("1.2.3.4", None, Some(8))),
            (0, 0x01000000, 0x01020304)
        );
    }

    #[test]
    fn test_sort_key_degrades() {
        assert_eq!(sort_key(&enriched("not-an-ip", Some(7), Some(24))), (7, 0, 0));
        assert_eq!(sort_key(&enriched("8.8.8.8", Some(7), Some(99))), (7, 0, 0));

        let unenriched = CorrelatedRow::Resolved {
            resolution: ResolutionRecord::default(),
            ip: "10.0.0.1".to_string(),
            enrichment: None,
        };
        assert_eq!(sort_key(&unenriched), (0, 0, 0x0a000001));
    }

    #[test]
    fn test_sort_is_stable() {
        let mut rows = vec![
            enriched("8.8.8.8", Some(15169), Some(24)),
            enriched("1.1.1.1", Some(13335), Some(24)),
            enriched("8.8.8.8", Some(15169), Some(24)),
            enriched("8.8.4.4", Some(15169), Some(24)),
        ];
        if let CorrelatedRow::Enriched(r) = &mut rows[2] {
            r.geo = Some(Default::default());
        }
        sort_rows(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.ip()).collect();
        assert_eq!(order, vec!["1.1.1.1", "8.8.4.4", "8.8.8.8", "8.8.8.8"]);
        // equal keys keep input order: the copy without geo came first
        assert!(rows[2].enrichment().and_then(|e| e.geo.as_ref()).is_none());
        assert!(rows[3].enrichment().and_then(|e| e.geo.as_ref()).is_some());
    }

    #[test]
    fn test_two_asns_one_separator() {
        let rows = vec![
            enriched("8.8.8.8", Some(15169), Some(24)),
            enriched("1.1.1.1", Some(13335), Some(24)),
        ];
        let entries = order(rows, true);
        assert_eq!(ips(&entries), vec!["1.1.1.1", "--", "8.8.8.8"]);
    }

    #[test]
    fn test_absent_asn_grouped_first() {
        let rows = vec![
            enriched("8.8.8.8", Some(15169), Some(24)),
            enriched("5.5.5.5", None, Some(16)),
            enriched("1.1.1.1", Some(13335), Some(24)),
            enriched("4.4.4.4", None, None),
        ];
        let entries = order(rows, true);
        assert_eq!(
            ips(&entries),
            vec!["4.4.4.4", "5.5.5.5", "--", "1.1.1.1", "--", "8.8.8.8"]
        );
    }

    #[test]
    fn test_separator_count() {
        let keys = vec![1, 1, 2, 3, 3, 3, 7];
        let entries = group_by_key(keys, |k| *k);
        let separators = entries.iter().filter(|e| e.is_separator()).count();
        assert_eq!(separators, 3);

        // never at the boundaries, never adjacent
        assert!(!entries[0].is_separator());
        assert!(!entries[entries.len() - 1].is_separator());
        assert!(entries
            .windows(2)
            .all(|w| !(w[0].is_separator() && w[1].is_separator())));
    }

    #[test]
    fn test_single_group_and_empty() {
        let entries = group_by_key(vec![5, 5, 5], |k| *k);
        assert!(entries.iter().all(|e| !e.is_separator()));

        let entries = group_by_key(Vec::<u32>::new(), |k| *k);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_ungrouped() {
        let rows = vec![
            enriched("8.8.8.8", Some(15169), Some(24)),
            enriched("1.1.1.1", Some(13335), Some(24)),
        ];
        let entries = order(rows, false);
        assert_eq!(ips(&entries), vec!["1.1.1.1", "8.8.8.8"]);
    }
}
