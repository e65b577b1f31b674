//! [`Extract`] → CSV.
//!
//! Output is readable by [`crate::read_extract`] and by Postgres `COPY ... CSV
//! HEADER` into a table with `text[]` set columns.

use std::{fs::File, io, path::Path};

use lucera_core::{
  ingredient::{Ingredient, TagSet},
  merge::Extract,
};

use crate::{COLUMNS, Result};

// ─── Field encoders ──────────────────────────────────────────────────────────

fn bool_field(value: bool) -> String { if value { "true" } else { "false" }.to_owned() }

fn pct_field(value: Option<f64>) -> String { value.map(|v| v.to_string()).unwrap_or_default() }

fn needs_quotes(element: &str) -> bool {
  element.is_empty()
    || element.eq_ignore_ascii_case("null")
    || element
      .chars()
      .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace())
}

/// Encode a set as a Postgres array literal, e.g. `{a,"b, c"}`.
pub(crate) fn tags_field(tags: Option<&TagSet>) -> String {
  let Some(tags) = tags.filter(|t| !t.is_empty()) else {
    return String::new();
  };

  let elements: Vec<String> = tags
    .iter()
    .map(|element| {
      if needs_quotes(element) {
        format!("\"{}\"", element.replace('\\', "\\\\").replace('"', "\\\""))
      } else {
        element.clone()
      }
    })
    .collect();

  format!("{{{}}}", elements.join(","))
}

fn record(ingredient: &Ingredient) -> [String; 10] {
  [
    ingredient.inci_name.clone(),
    pct_field(ingredient.natural_origin_pct),
    bool_field(ingredient.is_eu_banned),
    bool_field(ingredient.is_eu_restricted),
    bool_field(ingredient.is_sin_list),
    tags_field(ingredient.sin_list_flags.as_ref()),
    bool_field(ingredient.is_nanomaterial),
    bool_field(ingredient.is_nanomaterial_whitelisted),
    tags_field(ingredient.restriction.as_ref()),
    ingredient.data_source.clone().unwrap_or_default(),
  ]
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Write `extract` as CSV with a header row, in extract order.
pub fn write_extract<W: io::Write>(writer: W, extract: &Extract) -> Result<()> {
  let mut csv = csv::Writer::from_writer(writer);
  csv.write_record(COLUMNS)?;
  for ingredient in extract.iter() {
    csv.write_record(record(ingredient))?;
  }
  csv.flush()?;
  tracing::debug!(rows = extract.len(), "wrote extract");
  Ok(())
}

pub fn write_extract_path(path: impl AsRef<Path>, extract: &Extract) -> Result<()> {
  write_extract(File::create(path)?, extract)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse::parse_tags;

  fn tags(items: &[&str]) -> TagSet { items.iter().map(|s| s.to_string()).collect() }

  fn written(extract: &Extract) -> String {
    let mut buf = Vec::new();
    write_extract(&mut buf, extract).unwrap();
    String::from_utf8(buf).unwrap()
  }

  #[test]
  fn header_and_defaults() {
    let extract: Extract = [Ingredient::new("Aqua")].into_iter().collect();
    let out = written(&extract);
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some(COLUMNS.join(",").as_str()));
    assert_eq!(lines.next(), Some("Aqua,,false,false,false,,false,false,,"));
    assert_eq!(lines.next(), None);
  }

  #[test]
  fn sets_are_quoted_when_needed() {
    assert_eq!(tags_field(None), "");
    assert_eq!(tags_field(Some(&TagSet::new())), "");
    assert_eq!(tags_field(Some(&tags(&["pbt", "carcinogen"]))), "{carcinogen,pbt}");
    assert_eq!(
      tags_field(Some(&tags(&["Max 5%, rinse-off"]))),
      r#"{"Max 5%, rinse-off"}"#
    );
    assert_eq!(tags_field(Some(&tags(&["NULL"]))), r#"{"NULL"}"#);
    assert_eq!(tags_field(Some(&tags(&[r#"a"b\c"#]))), r#"{"a\"b\\c"}"#);
  }

  #[test]
  fn awkward_sets_survive_a_reparse() {
    let set = tags(&["Max 5%, rinse-off", "NULL", r#"say "hi""#, "{braced}"]);
    assert_eq!(parse_tags(&tags_field(Some(&set))), Some(set));
  }

  #[test]
  fn written_files_read_back() {
    let row = Ingredient {
      natural_origin_pct: Some(87.5),
      restriction: Some(tags(&["Max 5%, rinse-off products only"])),
      is_sin_list: true,
      sin_list_flags: Some(tags(&["Carcinogen", "PBT"])),
      data_source: Some("ChemSec SIN List".into()),
      ..Ingredient::new("Formaldehyde")
    };
    let extract: Extract = [row.clone(), Ingredient::new("Aqua")].into_iter().collect();

    let parsed = crate::read_extract(written(&extract).as_bytes()).unwrap();
    assert!(parsed.skipped.is_empty());
    assert_eq!(parsed.extract, extract);
  }
}
