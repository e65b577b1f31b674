//! Encoding and decoding helpers between [`lucera_core`] types and the plain
//! column values stored in SQLite.
//!
//! Tag sets are stored as compact JSON arrays, with `NULL` for an absent or
//! empty set. UUIDs are stored as hyphenated lowercase strings.

use lucera_core::{
  error::{MalformedReason, MalformedRecord},
  ingredient::{Ingredient, IngredientRecord, TagSet, non_empty},
  store::FetchedRecord,
};
use uuid::Uuid;

use crate::Result;

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── TagSet ──────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: Option<&TagSet>) -> Result<Option<String>> {
  match tags {
    Some(set) if !set.is_empty() => Ok(Some(serde_json::to_string(set)?)),
    _ => Ok(None),
  }
}

pub fn decode_tags(s: Option<&str>) -> Result<Option<TagSet>> {
  match s {
    Some(json) => Ok(non_empty(serde_json::from_str(json)?)),
    None => Ok(None),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values ready to bind for an insert or upsert.
pub struct EncodedIngredient {
  pub inci_name:                   String,
  pub natural_origin_pct:          Option<f64>,
  pub restriction:                 Option<String>,
  pub is_eu_banned:                bool,
  pub is_eu_restricted:            bool,
  pub is_sin_list:                 bool,
  pub is_nanomaterial:             bool,
  pub is_nanomaterial_whitelisted: bool,
  pub sin_list_flags:              Option<String>,
  pub data_source:                 Option<String>,
}

impl EncodedIngredient {
  pub fn new(ingredient: &Ingredient) -> Result<Self> {
    Ok(Self {
      inci_name:                   ingredient.inci_name.clone(),
      natural_origin_pct:          ingredient.natural_origin_pct,
      restriction:                 encode_tags(ingredient.restriction.as_ref())?,
      is_eu_banned:                ingredient.is_eu_banned,
      is_eu_restricted:            ingredient.is_eu_restricted,
      is_sin_list:                 ingredient.is_sin_list,
      is_nanomaterial:             ingredient.is_nanomaterial,
      is_nanomaterial_whitelisted: ingredient.is_nanomaterial_whitelisted,
      sin_list_flags:              encode_tags(ingredient.sin_list_flags.as_ref())?,
      data_source:                 ingredient.data_source.clone(),
    })
  }
}

/// Raw values read directly from an `ingredient_master` row.
pub struct RawIngredient {
  pub id:                          String,
  pub inci_name:                   Option<String>,
  pub natural_origin_pct:          Option<f64>,
  pub restriction:                 Option<String>,
  pub is_eu_banned:                bool,
  pub is_eu_restricted:            bool,
  pub is_sin_list:                 bool,
  pub is_nanomaterial:             bool,
  pub is_nanomaterial_whitelisted: bool,
  pub sin_list_flags:              Option<String>,
  pub data_source:                 Option<String>,
}

/// A row whose columns did not have the expected SQLite types.
pub struct UnreadableRow {
  pub id:    Option<String>,
  pub error: String,
}

impl UnreadableRow {
  pub fn into_malformed(self) -> MalformedRecord {
    MalformedRecord {
      id:     self.id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
      reason: MalformedReason::Undecodable(self.error),
    }
  }
}

impl RawIngredient {
  /// Read one row, keeping a column type mismatch as data so the rest of the
  /// page can still be read.
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Self, UnreadableRow>> {
    Ok(Self::from_row(row).map_err(|e| UnreadableRow { id: row.get(0).ok(), error: e.to_string() }))
  }

  /// Build from a row selected with [`crate::store`]'s column order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                          row.get(0)?,
      inci_name:                   row.get(1)?,
      natural_origin_pct:          row.get(2)?,
      restriction:                 row.get(3)?,
      is_eu_banned:                row.get(4)?,
      is_eu_restricted:            row.get(5)?,
      is_sin_list:                 row.get(6)?,
      is_nanomaterial:             row.get(7)?,
      is_nanomaterial_whitelisted: row.get(8)?,
      sin_list_flags:              row.get(9)?,
      data_source:                 row.get(10)?,
    })
  }

  /// A `NULL` name decodes to an empty string, which validation reports as a
  /// missing name.
  pub fn into_record(self) -> Result<IngredientRecord> {
    Ok(IngredientRecord {
      id:         decode_uuid(&self.id)?,
      ingredient: Ingredient {
        inci_name:                   self.inci_name.unwrap_or_default(),
        natural_origin_pct:          self.natural_origin_pct,
        restriction:                 decode_tags(self.restriction.as_deref())?,
        is_eu_banned:                self.is_eu_banned,
        is_eu_restricted:            self.is_eu_restricted,
        is_sin_list:                 self.is_sin_list,
        is_nanomaterial:             self.is_nanomaterial,
        is_nanomaterial_whitelisted: self.is_nanomaterial_whitelisted,
        sin_list_flags:              decode_tags(self.sin_list_flags.as_deref())?,
        data_source:                 self.data_source,
      },
    })
  }

  /// Decode, reporting a bad cell as a malformed record instead of an error.
  pub fn into_fetched(self) -> FetchedRecord {
    let id = Uuid::parse_str(&self.id).ok();
    self.into_record().map_err(|e| MalformedRecord {
      id,
      reason: MalformedReason::Undecodable(e.to_string()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_tag_set_encodes_as_null() {
    assert_eq!(encode_tags(Some(&TagSet::new())).unwrap(), None);
    assert_eq!(encode_tags(None).unwrap(), None);
  }

  #[test]
  fn tags_are_stored_sorted() {
    let set: TagSet = ["b".to_owned(), "a".to_owned()].into_iter().collect();
    assert_eq!(encode_tags(Some(&set)).unwrap().as_deref(), Some(r#"["a","b"]"#));
  }

  #[test]
  fn empty_json_array_decodes_as_none() {
    assert_eq!(decode_tags(Some("[]")).unwrap(), None);
    let decoded = decode_tags(Some(r#"["x","x"]"#)).unwrap().unwrap();
    assert_eq!(decoded.len(), 1);
  }

  fn raw(id: &str, restriction: Option<&str>) -> RawIngredient {
    RawIngredient {
      id:                          id.to_owned(),
      inci_name:                   Some("Squalane".into()),
      natural_origin_pct:          None,
      restriction:                 restriction.map(str::to_owned),
      is_eu_banned:                false,
      is_eu_restricted:            false,
      is_sin_list:                 false,
      is_nanomaterial:             false,
      is_nanomaterial_whitelisted: false,
      sin_list_flags:              None,
      data_source:                 None,
    }
  }

  #[test]
  fn free_text_cell_is_reported_with_its_id() {
    let id = Uuid::new_v4();
    let bad = raw(&encode_uuid(id), Some("Max 5% in leave-on")).into_fetched().unwrap_err();
    assert_eq!(bad.id, Some(id));
    assert!(matches!(bad.reason, MalformedReason::Undecodable(_)));
  }

  #[test]
  fn bad_id_is_reported_without_one() {
    let bad = raw("not-a-uuid", None).into_fetched().unwrap_err();
    assert_eq!(bad.id, None);
    assert!(matches!(bad.reason, MalformedReason::Undecodable(_)));
  }
}
