//! Per-source row builders.
//!
//! Each collaborator that harvests a registry hands over a raw dump in its own
//! shape. These builders give every source's rows the same fixed defaults and
//! provenance label so the extracts can be merged and imported uniformly.

use std::{fmt, io, str::FromStr};

use lucera_core::{
  ingredient::{Ingredient, TagSet, non_empty},
  merge::Extract,
};
use serde::Deserialize;

use crate::{
  Error, ParsedExtract, Result, RowIssue, SkippedRow, cas::find_cas_numbers,
  parse::{parse_percent, unreadable},
};

/// A registry that feeds the ingredient table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
  /// EU CosIng Annex II (prohibited substances), as extracted PDF text.
  CosingProhibited,
  /// ChemSec SIN List, as a `cas,health_concerns` CSV.
  ChemSecSinList,
  /// COSMOS certified raw materials, as an `inci_name,pemo_pct,restriction` CSV.
  CosmosApproved,
}

impl Source {
  pub const ALL: [Source; 3] =
    [Source::CosingProhibited, Source::ChemSecSinList, Source::CosmosApproved];

  /// Provenance written to `data_source`.
  pub fn label(self) -> &'static str {
    match self {
      Source::CosingProhibited => "COSING Prohibited List",
      Source::ChemSecSinList => "ChemSec SIN List",
      Source::CosmosApproved => "COSMOS Certified Raw Materials without Organic Content",
    }
  }

  /// Command-line spelling.
  pub fn as_str(self) -> &'static str {
    match self {
      Source::CosingProhibited => "cosing-prohibited",
      Source::ChemSecSinList => "chemsec-sin-list",
      Source::CosmosApproved => "cosmos-approved",
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Source {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Source::ALL
      .into_iter()
      .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::UnknownSource(s.to_owned()))
  }
}

// ─── Row builders ────────────────────────────────────────────────────────────

const PROHIBITED_PCT: f64 = 10.0;
const SIN_LIST_PCT: f64 = 15.0;

/// A prohibited substance, keyed by its CAS number.
pub fn prohibited_entry(cas: &str) -> Ingredient {
  Ingredient {
    natural_origin_pct: Some(PROHIBITED_PCT),
    is_eu_banned: true,
    data_source: Some(Source::CosingProhibited.label().to_owned()),
    ..Ingredient::new(cas.trim())
  }
}

/// A SIN-list substance; `health_concerns` is the comma-separated text from the
/// list's hazard column.
pub fn sin_list_entry(cas: &str, health_concerns: &str) -> Ingredient {
  let flags: TagSet = health_concerns
    .split(',')
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .map(str::to_owned)
    .collect();

  Ingredient {
    natural_origin_pct: Some(SIN_LIST_PCT),
    is_sin_list: true,
    sin_list_flags: non_empty(flags),
    data_source: Some(Source::ChemSecSinList.label().to_owned()),
    ..Ingredient::new(cas.trim())
  }
}

/// A COSMOS-certified raw material. The registry publishes the
/// petrochemical-origin share (`"12,5%"`); the natural share is its complement.
pub fn cosmos_entry(name: &str, pemo_pct: &str, restriction: &str) -> Result<Ingredient> {
  let pemo = parse_percent(pemo_pct)
    .filter(|p| (0.0..=100.0).contains(p))
    .ok_or_else(|| Error::InvalidPercent(pemo_pct.to_owned()))?;

  let restriction = restriction.trim();
  Ok(Ingredient {
    natural_origin_pct: Some(100.0 - pemo),
    restriction: (!restriction.is_empty()).then(|| TagSet::from([restriction.to_owned()])),
    data_source: Some(Source::CosmosApproved.label().to_owned()),
    ..Ingredient::new(name.trim())
  })
}

// ─── Raw dumps ───────────────────────────────────────────────────────────────

/// Every CAS number in extracted Annex II text, once each, in order.
pub fn prohibited_extract(text: &str) -> Extract {
  find_cas_numbers(text).iter().map(|cas| prohibited_entry(cas)).collect()
}

#[derive(Debug, Deserialize)]
struct SinListRow {
  cas:             String,
  #[serde(default)]
  health_concerns: String,
}

#[derive(Debug, Deserialize)]
struct CosmosRow {
  inci_name:   String,
  pemo_pct:    String,
  #[serde(default)]
  restriction: String,
}

/// Build an extract from a raw dump of `source`.
pub fn read_raw<R: io::Read>(source: Source, mut reader: R) -> Result<ParsedExtract> {
  let parsed = match source {
    Source::CosingProhibited => {
      let mut text = String::new();
      reader.read_to_string(&mut text)?;
      ParsedExtract { extract: prohibited_extract(&text), skipped: Vec::new() }
    }
    Source::ChemSecSinList => read_rows(reader, |row: SinListRow| {
      Ok(sin_list_entry(&row.cas, &row.health_concerns))
    })?,
    Source::CosmosApproved => read_rows(reader, |row: CosmosRow| {
      cosmos_entry(&row.inci_name, &row.pemo_pct, &row.restriction)
        .map_err(|_| RowIssue::InvalidPercent(row.pemo_pct.trim().to_owned()))
    })?,
  };

  tracing::info!(
    %source,
    rows = parsed.extract.len(),
    skipped = parsed.skipped.len(),
    "converted raw dump"
  );
  Ok(parsed)
}

fn read_rows<R, T, F>(reader: R, build: F) -> Result<ParsedExtract>
where
  R: io::Read,
  T: for<'de> Deserialize<'de>,
  F: Fn(T) -> Result<Ingredient, RowIssue>,
{
  let mut csv = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
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
    let row: T = match record.deserialize(Some(&headers)) {
      Ok(row) => row,
      Err(e) => {
        parsed.skipped.push(unreadable(e, Some(line))?);
        continue;
      }
    };

    let issue = match build(row).and_then(|i| i.check().map(|()| i).map_err(RowIssue::from)) {
      Ok(ingredient) => {
        if parsed.extract.insert(ingredient) {
          continue;
        }
        RowIssue::Duplicate
      }
      Err(issue) => issue,
    };
    tracing::warn!(line, %issue, "skipping raw row");
    parsed.skipped.push(SkippedRow { line, issue });
  }

  Ok(parsed)
}
