//! CSV → [`Extract`].
//!
//! Extract files come from independent tools, so the reader is lenient about
//! value spellings and strict about structure: a bad row is reported with its
//! line number and skipped, never fatal for the file.

use std::{fs::File, io, path::Path};

use lucera_core::{
  error::MalformedReason,
  ingredient::{Ingredient, TagSet, non_empty},
  merge::Extract,
};
use serde::Deserialize;
use thiserror::Error;

use crate::Result;

/// Why a row was left out of the extract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowIssue {
  #[error(transparent)]
  Malformed(#[from] MalformedReason),

  #[error("natural_origin_pct {0:?} is not a number")]
  InvalidPercent(String),

  #[error("{column} {value:?} is not a boolean")]
  InvalidBool { column: &'static str, value: String },

  #[error("duplicate inci_name; the first row was kept")]
  Duplicate,

  /// The row could not be read as CSV (bad UTF-8, missing required field).
  #[error("unreadable row: {0}")]
  Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
  /// 1-based line in the source file.
  pub line:  u64,
  pub issue: RowIssue,
}

/// The rows accepted from a file plus the ones that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExtract {
  pub extract: Extract,
  pub skipped: Vec<SkippedRow>,
}

/// One CSV row as text; every column is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
  inci_name:                   Option<String>,
  natural_origin_pct:          Option<String>,
  is_eu_banned:                Option<String>,
  is_eu_restricted:            Option<String>,
  is_sin_list:                 Option<String>,
  sin_list_flags:              Option<String>,
  is_nanomaterial:             Option<String>,
  is_nanomaterial_whitelisted: Option<String>,
  restriction:                 Option<String>,
  data_source:                 Option<String>,
}

impl CsvRow {
  fn into_ingredient(self) -> Result<Ingredient, RowIssue> {
    let natural_origin_pct = match blank_to_none(self.natural_origin_pct) {
      Some(raw) => Some(parse_percent(&raw).ok_or(RowIssue::InvalidPercent(raw))?),
      None => None,
    };

    let ingredient = Ingredient {
      inci_name: self.inci_name.unwrap_or_default().trim().to_owned(),
      natural_origin_pct,
      restriction: self.restriction.as_deref().and_then(parse_tags),
      is_eu_banned: parse_bool("is_eu_banned", self.is_eu_banned)?,
      is_eu_restricted: parse_bool("is_eu_restricted", self.is_eu_restricted)?,
      is_sin_list: parse_bool("is_sin_list", self.is_sin_list)?,
      is_nanomaterial: parse_bool("is_nanomaterial", self.is_nanomaterial)?,
      is_nanomaterial_whitelisted: parse_bool(
        "is_nanomaterial_whitelisted",
        self.is_nanomaterial_whitelisted,
      )?,
      sin_list_flags: self.sin_list_flags.as_deref().and_then(parse_tags),
      data_source: blank_to_none(self.data_source),
    };
    ingredient.check()?;
    Ok(ingredient)
  }
}

/// Read an extract from CSV with a header row.
pub fn read_extract<R: io::Read>(reader: R) -> Result<ParsedExtract> {
  let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
  let headers = csv.headers()?.clone();
  let mut parsed = ParsedExtract::default();

  for result in csv.records() {
    let record = match result {
      Ok(record) => record,
      Err(e) => {
        parsed.skipped.push(unreadable(e, None)?);
        continue;
      }
    };
    let line = record.position().map_or(0, |p| p.line());
    let row: CsvRow = match record.deserialize(Some(&headers)) {
      Ok(row) => row,
      Err(e) => {
        parsed.skipped.push(unreadable(e, Some(line))?);
        continue;
      }
    };

    match row.into_ingredient() {
      Ok(ingredient) => {
        if !parsed.extract.insert(ingredient) {
          tracing::debug!(line, "duplicate extract row");
          parsed.skipped.push(SkippedRow { line, issue: RowIssue::Duplicate });
        }
      }
      Err(issue) => {
        tracing::warn!(line, %issue, "skipping extract row");
        parsed.skipped.push(SkippedRow { line, issue });
      }
    }
  }

  tracing::debug!(rows = parsed.extract.len(), skipped = parsed.skipped.len(), "read extract");
  Ok(parsed)
}

pub fn read_extract_path(path: impl AsRef<Path>) -> Result<ParsedExtract> {
  read_extract(File::open(path)?)
}

/// Turn a per-row CSV failure into a skipped row. I/O errors still abort the
/// read.
pub(crate) fn unreadable(err: csv::Error, line: Option<u64>) -> Result<SkippedRow> {
  if matches!(err.kind(), csv::ErrorKind::Io(_)) {
    return Err(err.into());
  }
  let line = line.or_else(|| err.position().map(|p| p.line())).unwrap_or(0);
  let issue = RowIssue::Unreadable(err.to_string());
  tracing::warn!(line, %issue, "skipping unreadable row");
  Ok(SkippedRow { line, issue })
}

// ─── Field parsers ───────────────────────────────────────────────────────────

fn blank_to_none(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_bool(column: &'static str, value: Option<String>) -> Result<bool, RowIssue> {
  let Some(raw) = blank_to_none(value) else {
    return Ok(false);
  };
  match raw.to_ascii_lowercase().as_str() {
    "true" | "t" | "1" | "yes" | "y" => Ok(true),
    "false" | "f" | "0" | "no" | "n" => Ok(false),
    _ => Err(RowIssue::InvalidBool { column, value: raw }),
  }
}

/// Parse a percentage such as `"87.5"`, `"12,5%"` or `" 40 % "`.
pub(crate) fn parse_percent(raw: &str) -> Option<f64> {
  let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
  cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a tag set.
///
/// A Postgres array literal (`{a,"b, c"}`) yields its elements; any other
/// non-blank text is a single element, since free-text restrictions often
/// contain commas.
pub(crate) fn parse_tags(raw: &str) -> Option<TagSet> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) else {
    return non_empty(TagSet::from([raw.to_owned()]));
  };

  let mut tags = TagSet::new();
  let mut current = String::new();
  let mut quoted = false;
  let mut was_quoted = false;
  let mut chars = inner.chars();

  while let Some(c) = chars.next() {
    match c {
      '\\' if quoted => {
        if let Some(escaped) = chars.next() {
          current.push(escaped);
        }
      }
      '"' => {
        quoted = !quoted;
        was_quoted = true;
      }
      ',' if !quoted => {
        push_element(&mut tags, &current, was_quoted);
        current.clear();
        was_quoted = false;
      }
      _ => current.push(c),
    }
  }
  push_element(&mut tags, &current, was_quoted);

  non_empty(tags)
}

fn push_element(tags: &mut TagSet, element: &str, was_quoted: bool) {
  if was_quoted {
    if !element.is_empty() {
      tags.insert(element.to_owned());
    }
    return;
  }
  let element = element.trim();
  if !element.is_empty() && !element.eq_ignore_ascii_case("null") {
    tags.insert(element.to_owned());
  }
}
