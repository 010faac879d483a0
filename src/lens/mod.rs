//! Lens module
//!
//! High-level "lens" abstractions that combine business logic with output
//! formatting, reusable from the CLI or as a library.
//!
//! | Lens | Feature Required | Dependencies |
//! |------|-----------------|--------------|
//! | `IpLens` | (always) | maxminddb, ipnet |
//! | `IpLens::format_report` | `display` | tabled |
//!
//! Each lens module exports a **Lens struct**, **Args structs** for its input
//! and the **output types** it produces:
//!
//! ```rust,ignore
//! use ipmeta::lens::ip::{IpLens, IpLookupArgs, IpReport};
//! use ipmeta::lens::utils::OutputFormat;
//! ```

pub mod utils;

// IpLens - address validation, enrichment, correlation and ordering
pub mod ip;
