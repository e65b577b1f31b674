//! Ingredient types: one row of the canonical ingredient table.
//!
//! An [`Ingredient`] is the attribute set harvested from a source. Once it is
//! persisted the store assigns an id and hands it back as an
//! [`IngredientRecord`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{MalformedReason, MalformedRecord},
  store::FetchedRecord,
};

/// A set of labels (restrictions, SIN-list health flags). Ordered so that
/// serialisation and aggregation are deterministic.
pub type TagSet = BTreeSet<String>;

/// Collapse an empty set to `None`; a present set is never empty.
pub fn non_empty(set: TagSet) -> Option<TagSet> {
  if set.is_empty() { None } else { Some(set) }
}

// ─── Ingredient ──────────────────────────────────────────────────────────────

/// The attributes of one ingredient, without store identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  /// The INCI name; the dedup key once split into atomic parts.
  pub inci_name:                   String,
  /// Share of natural origin, in `[0, 100]`.
  pub natural_origin_pct:          Option<f64>,
  pub restriction:                 Option<TagSet>,
  pub is_eu_banned:                bool,
  pub is_eu_restricted:            bool,
  pub is_sin_list:                 bool,
  pub is_nanomaterial:             bool,
  pub is_nanomaterial_whitelisted: bool,
  /// Health-concern flags from the SIN list.
  pub sin_list_flags:              Option<TagSet>,
  /// Provenance label of the source that produced the row.
  pub data_source:                 Option<String>,
}

impl Ingredient {
  /// Convenience constructor with every optional field empty.
  pub fn new(inci_name: impl Into<String>) -> Self {
    Self { inci_name: inci_name.into(), ..Self::default() }
  }

  /// A copy of this ingredient under a different name; every other field is
  /// inherited.
  pub fn renamed(&self, inci_name: impl Into<String>) -> Self {
    Self { inci_name: inci_name.into(), ..self.clone() }
  }

  /// The canonical grouping key: the trimmed name.
  pub fn canonical_name(&self) -> &str { self.inci_name.trim() }

  /// Check the fields every normalization step relies on.
  pub fn check(&self) -> Result<(), MalformedReason> {
    if self.canonical_name().is_empty() {
      return Err(MalformedReason::MissingName);
    }
    if let Some(pct) = self.natural_origin_pct
      && !(0.0..=100.0).contains(&pct)
    {
      return Err(MalformedReason::PercentOutOfRange(pct));
    }
    Ok(())
  }

  /// Fold an incoming row for the same name into this one, the way an upsert
  /// does: booleans are OR-ed so a `true` is never cleared, and fields the
  /// incoming row leaves empty keep their current value.
  pub fn absorb(&mut self, incoming: &Ingredient) {
    if incoming.natural_origin_pct.is_some() {
      self.natural_origin_pct = incoming.natural_origin_pct;
    }
    if incoming.restriction.is_some() {
      self.restriction.clone_from(&incoming.restriction);
    }
    if incoming.sin_list_flags.is_some() {
      self.sin_list_flags.clone_from(&incoming.sin_list_flags);
    }
    if incoming.data_source.is_some() {
      self.data_source.clone_from(&incoming.data_source);
    }
    self.is_eu_banned |= incoming.is_eu_banned;
    self.is_eu_restricted |= incoming.is_eu_restricted;
    self.is_sin_list |= incoming.is_sin_list;
    self.is_nanomaterial |= incoming.is_nanomaterial;
    self.is_nanomaterial_whitelisted |= incoming.is_nanomaterial_whitelisted;
  }
}

// ─── IngredientRecord ────────────────────────────────────────────────────────

/// An ingredient as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
  /// Store-assigned identifier.
  pub id:         Uuid,
  #[serde(flatten)]
  pub ingredient: Ingredient,
}

impl IngredientRecord {
  pub fn inci_name(&self) -> &str { &self.ingredient.inci_name }

  pub fn validate(&self) -> Result<(), MalformedRecord> {
    self
      .ingredient
      .check()
      .map_err(|reason| MalformedRecord { id: Some(self.id), reason })
  }
}

/// Separate valid records from malformed ones, preserving input order in both.
/// Rows the store could not decode arrive already as [`MalformedRecord`]s.
pub fn partition_valid(
  records: Vec<FetchedRecord>,
) -> (Vec<IngredientRecord>, Vec<MalformedRecord>) {
  let mut valid = Vec::with_capacity(records.len());
  let mut malformed = Vec::new();

  for fetched in records {
    match fetched.and_then(|record| record.validate().map(|()| record)) {
      Ok(record) => valid.push(record),
      Err(bad) => {
        tracing::warn!(record = %bad, "skipping malformed record");
        malformed.push(bad);
      }
    }
  }

  (valid, malformed)
}

// ─── Aggregated fields ───────────────────────────────────────────────────────

/// The fields recomputed for the survivor of a duplicate group. Nothing else
/// on the survivor is changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFields {
  pub natural_origin_pct: Option<f64>,
  pub restriction:        Option<TagSet>,
}

/// Input to [`crate::store::IngredientStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivorUpdate {
  pub id:     Uuid,
  pub fields: AggregatedFields,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_name_is_malformed() {
    assert_eq!(Ingredient::new("   ").check(), Err(MalformedReason::MissingName));
  }

  #[test]
  fn percent_bounds_are_inclusive() {
    let mut ing = Ingredient::new("Aqua");
    ing.natural_origin_pct = Some(100.0);
    assert!(ing.check().is_ok());
    ing.natural_origin_pct = Some(0.0);
    assert!(ing.check().is_ok());
    ing.natural_origin_pct = Some(100.5);
    assert_eq!(ing.check(), Err(MalformedReason::PercentOutOfRange(100.5)));
  }

  #[test]
  fn nan_percent_is_malformed() {
    let mut ing = Ingredient::new("Aqua");
    ing.natural_origin_pct = Some(f64::NAN);
    assert!(matches!(ing.check(), Err(MalformedReason::PercentOutOfRange(_))));
  }

  #[test]
  fn partition_keeps_order() {
    let rec = |name: &str| IngredientRecord {
      id:         Uuid::new_v4(),
      ingredient: Ingredient::new(name),
    };
    let records = vec![rec("B"), rec(""), rec("A")];
    let bad_id = records[1].id;
    let mut fetched: Vec<FetchedRecord> = records.into_iter().map(Ok).collect();
    fetched.insert(1, Err(MalformedRecord {
      id:     None,
      reason: MalformedReason::Undecodable("bad id".into()),
    }));

    let (valid, malformed) = partition_valid(fetched);
    let names: Vec<_> = valid.iter().map(|r| r.inci_name()).collect();
    assert_eq!(names, ["B", "A"]);
    assert_eq!(malformed.len(), 2);
    assert_eq!(malformed[0].id, None);
    assert_eq!(malformed[1].id, Some(bad_id));
    assert_eq!(malformed[1].reason, MalformedReason::MissingName);
  }

  fn tags(items: &[&str]) -> TagSet { items.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn absorb_never_clears_flags() {
    let mut stored = Ingredient {
      natural_origin_pct: Some(10.0),
      is_eu_banned: true,
      is_sin_list: true,
      sin_list_flags: Some(tags(&["Carcinogen"])),
      data_source: Some("COSING Prohibited List".into()),
      ..Ingredient::new("50-00-0")
    };
    stored.absorb(&Ingredient {
      natural_origin_pct: Some(97.5),
      is_nanomaterial: true,
      ..Ingredient::new("50-00-0")
    });

    assert_eq!(stored.natural_origin_pct, Some(97.5));
    assert!(stored.is_eu_banned);
    assert!(stored.is_sin_list);
    assert!(stored.is_nanomaterial);
    assert_eq!(stored.sin_list_flags, Some(tags(&["Carcinogen"])));
    assert_eq!(stored.data_source.as_deref(), Some("COSING Prohibited List"));
  }

  #[test]
  fn absorb_takes_present_fields() {
    let mut stored = Ingredient { restriction: Some(tags(&["old"])), ..Ingredient::new("Aqua") };
    stored.absorb(&Ingredient {
      restriction: Some(tags(&["new"])),
      data_source: Some("COSMOS".into()),
      ..Ingredient::new("Aqua")
    });
    assert_eq!(stored.restriction, Some(tags(&["new"])));
    assert_eq!(stored.data_source.as_deref(), Some("COSMOS"));
  }
}
