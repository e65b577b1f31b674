//! Cross-source merging of name-keyed extracts.
//!
//! Two sources are combined before anything reaches the store: a
//! prohibited-substances extract (the primary) and a SIN-list extract (the
//! secondary). Which side is primary is always the caller's choice.

use std::collections::HashMap;

use crate::ingredient::{Ingredient, IngredientRecord};

// ─── Extract ─────────────────────────────────────────────────────────────────

/// An insertion-ordered table of ingredients keyed by trimmed name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extract {
  rows:  Vec<Ingredient>,
  index: HashMap<String, usize>,
}

impl Extract {
  pub fn new() -> Self { Self::default() }

  /// Add `ingredient` under its trimmed name. The first row for a name wins;
  /// later duplicates and blank names are rejected and `false` is returned.
  pub fn insert(&mut self, mut ingredient: Ingredient) -> bool {
    let key = ingredient.canonical_name().to_owned();
    if key.is_empty() || self.index.contains_key(&key) {
      return false;
    }
    ingredient.inci_name.clone_from(&key);
    self.index.insert(key, self.rows.len());
    self.rows.push(ingredient);
    true
  }

  pub fn get(&self, name: &str) -> Option<&Ingredient> {
    self.index.get(name.trim()).map(|&i| &self.rows[i])
  }

  pub fn contains(&self, name: &str) -> bool { self.index.contains_key(name.trim()) }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &Ingredient> { self.rows.iter() }

  pub fn into_rows(self) -> Vec<Ingredient> { self.rows }
}

impl FromIterator<Ingredient> for Extract {
  fn from_iter<I: IntoIterator<Item = Ingredient>>(iter: I) -> Self {
    let mut extract = Self::new();
    for ingredient in iter {
      extract.insert(ingredient);
    }
    extract
  }
}

impl FromIterator<IngredientRecord> for Extract {
  fn from_iter<I: IntoIterator<Item = IngredientRecord>>(iter: I) -> Self {
    iter.into_iter().map(|r| r.ingredient).collect()
  }
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Counts reported for every merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
  /// Rows in the merged extract.
  pub total:          usize,
  pub primary_only:   usize,
  pub secondary_only: usize,
  /// Names present in both inputs.
  pub conflicts:      usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
  pub merged: Extract,
  pub stats:  MergeStats,
}

/// Merge two extracts.
///
/// Names found in only one input are copied unchanged: primary rows first, in
/// primary order, then secondary-only rows in secondary order. A name found in
/// both keeps the primary row, with `is_eu_banned` and `is_sin_list` forced
/// to `true` and `sin_list_flags` replaced by the secondary's flags.
pub fn merge(primary: Extract, secondary: Extract) -> MergeOutcome {
  let mut stats = MergeStats::default();
  let mut merged = Extract::new();

  for mut row in primary.rows {
    match secondary.get(&row.inci_name) {
      Some(other) => {
        row.is_eu_banned = true;
        row.is_sin_list = true;
        row.sin_list_flags.clone_from(&other.sin_list_flags);
        stats.conflicts += 1;
      }
      None => stats.primary_only += 1,
    }
    merged.insert(row);
  }

  for row in secondary.rows {
    if merged.contains(&row.inci_name) {
      continue;
    }
    merged.insert(row);
    stats.secondary_only += 1;
  }

  stats.total = merged.len();
  tracing::info!(
    total = stats.total,
    primary_only = stats.primary_only,
    secondary_only = stats.secondary_only,
    conflicts = stats.conflicts,
    "merged extracts"
  );

  MergeOutcome { merged, stats }
}
