//! IP lens types

use anyhow::Result;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::database::{AutonomousSystemInfo, GeoInfo};
use crate::datasets::ResolutionRecord;

/// Placeholder shown for any missing value
pub const NOT_AVAILABLE: &str = "N/A";

/// Mask `ip` down to its first `prefix_len` bits.
///
/// Host bits are cleared rather than rejected; only a prefix length longer
/// than the address family allows is an error.
pub fn network_address(ip: IpAddr, prefix_len: u8) -> Result<IpNet> {
    Ok(IpNet::new(ip, prefix_len)?.trunc())
}

/// Integer value of an address, used for ordering
pub fn ip_to_int(ip: &IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// A validated address annotated with its ASN and geolocation data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub ip: String,
    pub asn: Option<AutonomousSystemInfo>,
    pub geo: Option<GeoInfo>,
    /// Length of the longest matching prefix in the ASN database
    pub prefix_len: Option<u8>,
}

impl EnrichedRecord {
    pub fn asn_number(&self) -> Option<u32> {
        self.asn.as_ref().and_then(|a| a.number)
    }

    pub fn organization(&self) -> Option<&str> {
        self.asn.as_ref().and_then(|a| a.organization.as_deref())
    }

    /// The matched network, with host bits cleared.
    ///
    /// Without a prefix length the network is the address itself.
    pub fn network(&self) -> Result<IpNet> {
        let ip: IpAddr = self.ip.parse()?;
        match self.prefix_len {
            Some(len) => network_address(ip, len),
            None => Ok(IpNet::from(ip)),
        }
    }

    /// `<network base>/<len>`, or the bare IP when the prefix length is unknown
    pub fn network_notation(&self) -> String {
        match (self.prefix_len, self.network()) {
            (Some(len), Ok(net)) => format!("{}/{}", net.network(), len),
            _ => self.ip.clone(),
        }
    }

    /// `"<city>, <country>"` with `N/A` for missing names
    pub fn location_line(&self) -> String {
        match &self.geo {
            Some(geo) => format!(
                "{}, {}",
                geo.city_name().unwrap_or(NOT_AVAILABLE),
                geo.country_name().unwrap_or(NOT_AVAILABLE)
            ),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// One row of the output table before ordering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CorrelatedRow {
    /// An address given directly on the input
    Enriched(EnrichedRecord),
    /// One A record of a resolved host, with its enrichment if the address
    /// could be looked up
    Resolved {
        resolution: ResolutionRecord,
        ip: String,
        enrichment: Option<EnrichedRecord>,
    },
}

impl CorrelatedRow {
    pub fn enrichment(&self) -> Option<&EnrichedRecord> {
        match self {
            CorrelatedRow::Enriched(record) => Some(record),
            CorrelatedRow::Resolved { enrichment, .. } => enrichment.as_ref(),
        }
    }

    /// The address this row describes
    pub fn ip(&self) -> &str {
        match self {
            CorrelatedRow::Enriched(record) => &record.ip,
            CorrelatedRow::Resolved { ip, .. } => ip,
        }
    }
}

/// Per-item lookup misses; reported to the user but never fatal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ip", rename_all = "snake_case")]
pub enum LookupWarning {
    /// The ASN database has no record covering the address
    AsnNotFound(String),
    /// A resolved address has no enrichment entry at all
    NotEnriched(String),
}

impl fmt::Display for LookupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupWarning::AsnNotFound(ip) => write!(f, "ASN not found for IP: {}", ip),
            LookupWarning::NotEnriched(ip) => {
                write!(f, "IP not found in MaxMind database: {}", ip)
            }
        }
    }
}
