//! Address classification
//!
//! Only globally meaningful unicast addresses are worth looking up: private,
//! documentation, loopback, link-local, reserved, multicast and unspecified
//! ranges are filtered out before any database query.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// The private tables follow the IANA special-purpose registries entry for
// entry, including the globally reachable carve-outs listed as exceptions.

/// IPv4 ranges registered as not globally reachable
const V4_PRIVATE: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 29),
    (Ipv4Addr::new(192, 0, 0, 170), 31),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 255, 255, 255), 32),
];

/// Globally reachable hosts inside `192.0.0.0/29` (PCP and TURN anycast)
const V4_PRIVATE_EXCEPTIONS: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(192, 0, 0, 9), 32),
    (Ipv4Addr::new(192, 0, 0, 10), 32),
];

const V4_RESERVED: (Ipv4Addr, u8) = (Ipv4Addr::new(240, 0, 0, 0), 4);

const V6_PRIVATE: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::LOCALHOST, 128),
    (Ipv6Addr::UNSPECIFIED, 128),
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0, 0), 96),
    (Ipv6Addr::new(0x64, 0xff9b, 1, 0, 0, 0, 0, 0), 48),
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
    (Ipv6Addr::new(0x3fff, 0, 0, 0, 0, 0, 0, 0), 20),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
];

/// Globally reachable blocks inside `2001::/23`
const V6_PRIVATE_EXCEPTIONS: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 1), 128),
    (Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 2), 128),
    (Ipv6Addr::new(0x2001, 3, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0x2001, 4, 0x112, 0, 0, 0, 0, 0), 48),
    (Ipv6Addr::new(0x2001, 0x20, 0, 0, 0, 0, 0, 0), 28),
    (Ipv6Addr::new(0x2001, 0x30, 0, 0, 0, 0, 0, 0), 28),
];

/// IETF-reserved (unassigned) IPv6 blocks
const V6_RESERVED: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0), 8),
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 8),
    (Ipv6Addr::new(0x200, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0x400, 0, 0, 0, 0, 0, 0, 0), 6),
    (Ipv6Addr::new(0x800, 0, 0, 0, 0, 0, 0, 0), 5),
    (Ipv6Addr::new(0x1000, 0, 0, 0, 0, 0, 0, 0), 4),
    (Ipv6Addr::new(0x4000, 0, 0, 0, 0, 0, 0, 0), 3),
    (Ipv6Addr::new(0x6000, 0, 0, 0, 0, 0, 0, 0), 3),
    (Ipv6Addr::new(0x8000, 0, 0, 0, 0, 0, 0, 0), 3),
    (Ipv6Addr::new(0xa000, 0, 0, 0, 0, 0, 0, 0), 3),
    (Ipv6Addr::new(0xc000, 0, 0, 0, 0, 0, 0, 0), 3),
    (Ipv6Addr::new(0xe000, 0, 0, 0, 0, 0, 0, 0), 4),
    (Ipv6Addr::new(0xf000, 0, 0, 0, 0, 0, 0, 0), 5),
    (Ipv6Addr::new(0xf800, 0, 0, 0, 0, 0, 0, 0), 6),
    (Ipv6Addr::new(0xfe00, 0, 0, 0, 0, 0, 0, 0), 9),
];

fn v4_in(ip: &Ipv4Addr, ranges: &[(Ipv4Addr, u8)]) -> bool {
    ranges.iter().any(|(net, len)| {
        Ipv4Net::new(*net, *len)
            .map(|n| n.contains(ip))
            .unwrap_or(false)
    })
}

fn v6_in(ip: &Ipv6Addr, ranges: &[(Ipv6Addr, u8)]) -> bool {
    ranges.iter().any(|(net, len)| {
        Ipv6Net::new(*net, *len)
            .map(|n| n.contains(ip))
            .unwrap_or(false)
    })
}

/// Private-use or otherwise not globally reachable
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4_in(v4, V4_PRIVATE) && !v4_in(v4, V4_PRIVATE_EXCEPTIONS),
        IpAddr::V6(v6) => v6_in(v6, V6_PRIVATE) && !v6_in(v6, V6_PRIVATE_EXCEPTIONS),
    }
}

/// Reserved by the IETF for future or special use
pub fn is_reserved(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4_in(v4, &[V4_RESERVED]),
        IpAddr::V6(v6) => v6_in(v6, V6_RESERVED),
    }
}

/// Whether `ip` is a public unicast address worth enriching
pub fn is_routable_addr(ip: &IpAddr) -> bool {
    !(is_private(ip) || is_reserved(ip) || ip.is_multicast() || ip.is_unspecified())
}

/// Parse `raw` and check that it is a public unicast address.
///
/// Surrounding whitespace is ignored; anything that does not parse as an IP
/// address is rejected.
pub fn is_routable(raw: &str) -> bool {
    raw.trim()
        .parse::<IpAddr>()
        .map(|ip| is_routable_addr(&ip))
        .unwrap_or(false)
}
