//! External data sources
//!
//! - `dnsx`: hostname resolution through the `dnsx` subprocess

pub mod dnsx;

pub use dnsx::{parse_output, BatchResolver, DnsxResolver, ResolutionRecord, ResolverBinary};
