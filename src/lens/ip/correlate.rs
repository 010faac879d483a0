//! Join resolved hostnames with the enrichment of their A records

use std::collections::HashMap;

use super::types::{CorrelatedRow, EnrichedRecord, LookupWarning};
use crate::datasets::ResolutionRecord;

/// Expand every resolution record into one row per A record.
///
/// Each address is matched against `enrichment_by_ip`; addresses without an
/// entry still produce a row (with no enrichment) and a
/// [`LookupWarning::NotEnriched`]. Hosts without A records produce no rows.
/// Duplicate A records are kept as separate rows.
pub fn correlate(
    records: &[ResolutionRecord],
    enrichment_by_ip: &HashMap<String, EnrichedRecord>,
) -> (Vec<CorrelatedRow>, Vec<LookupWarning>) {
    let mut rows = Vec::with_capacity(records.iter().map(|r| r.a.len()).sum());
    let mut warnings = vec![];

    for record in records {
        for ip in &record.a {
            let enrichment = enrichment_by_ip.get(ip).cloned();
            if enrichment.is_none() {
                warnings.push(LookupWarning::NotEnriched(ip.clone()));
            }
            rows.push(CorrelatedRow::Resolved {
                resolution: record.clone(),
                ip: ip.clone(),
                enrichment,
            });
        }
    }

    (rows, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AutonomousSystemInfo;

    fn host(name: &str, a: &[&str]) -> ResolutionRecord {
        ResolutionRecord {
            host: name.to_string(),
            status_code: "NOERROR".to_string(),
            a: a.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn enriched(ip: &str, asn: u32) -> EnrichedRecord {
        EnrichedRecord {
            ip: ip.to_string(),
            asn: Some(AutonomousSystemInfo {
                number: Some(asn),
                organization: Some(format!("AS{}", asn)),
            }),
            geo: None,
            prefix_len: Some(24),
        }
    }

    #[test]
    fn test_one_row_per_a_record() {
        let records = vec![
            host("a.example", &["8.8.8.8", "1.1.1.1"]),
            host("nx.example", &[]),
            host("b.example", &["9.9.9.9"]),
        ];
        let mut map = HashMap::new();
        map.insert("8.8.8.8".to_string(), enriched("8.8.8.8", 15169));
        map.insert("1.1.1.1".to_string(), enriched("1.1.1.1", 13335));
        map.insert("9.9.9.9".to_string(), enriched("9.9.9.9", 19281));

        let (rows, warnings) = correlate(&records, &map);
        let total_a: usize = records.iter().map(|r| r.a.len()).sum();
        assert_eq!(rows.len(), total_a);
        assert!(warnings.is_empty());
        assert_eq!(rows[1].ip(), "1.1.1.1");
        assert_eq!(rows[1].enrichment().and_then(|e| e.asn_number()), Some(13335));
    }

    #[test]
    fn test_duplicate_a_records_kept() {
        let records = vec![host("example.com", &["8.8.8.8", "8.8.8.8"])];
        let mut map = HashMap::new();
        map.insert("8.8.8.8".to_string(), enriched("8.8.8.8", 15169));

        let (rows, _) = correlate(&records, &map);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].enrichment(), rows[1].enrichment());
        assert!(rows[0].enrichment().is_some());
    }

    #[test]
    fn test_missing_enrichment_is_absent() {
        let records = vec![host("internal.example", &["10.0.0.1", "8.8.8.8"])];
        let mut map = HashMap::new();
        map.insert("8.8.8.8".to_string(), enriched("8.8.8.8", 15169));

        let (rows, warnings) = correlate(&records, &map);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].enrichment().is_none());
        assert_eq!(rows[0].ip(), "10.0.0.1");
        assert_eq!(
            warnings,
            vec![LookupWarning::NotEnriched("10.0.0.1".to_string())]
        );
    }
}
