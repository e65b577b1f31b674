//! Tabular extract codec for Lucera.
//!
//! Converts between CSV files and [`lucera_core::merge::Extract`], and turns
//! raw per-source dumps (PDF text, crawler CSVs) into extracts. Pure
//! synchronous; no database dependencies.

pub mod cas;
pub mod error;
mod parse;
mod serialize;
pub mod source;

pub use error::{Error, Result};
pub use parse::{ParsedExtract, RowIssue, SkippedRow, read_extract, read_extract_path};
pub use serialize::{write_extract, write_extract_path};

/// Column order of every extract file.
pub const COLUMNS: [&str; 10] = [
  "inci_name",
  "natural_origin_pct",
  "is_eu_banned",
  "is_eu_restricted",
  "is_sin_list",
  "sin_list_flags",
  "is_nanomaterial",
  "is_nanomaterial_whitelisted",
  "restriction",
  "data_source",
];
