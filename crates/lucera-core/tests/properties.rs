//! Property tests for splitting and grouping.

use std::collections::HashSet;

use lucera_core::{
  group::group,
  ingredient::{Ingredient, IngredientRecord},
  split::{split, split_composite},
};
use proptest::prelude::*;
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

/// Names without any recognised separator, trimmed.
fn atom_strategy() -> impl Strategy<Value = String> {
  "[A-Za-z0-9][A-Za-z0-9 .-]{0,20}[A-Za-z0-9]"
}

fn separator_strategy() -> impl Strategy<Value = &'static str> {
  prop_oneof![
    Just(","),
    Just(", "),
    Just(" + "),
    Just("&"),
    Just(" & "),
    Just(" (and) "),
    Just(" (AND) "),
    Just("(And)"),
  ]
}

fn composite_strategy() -> impl Strategy<Value = (Vec<String>, String)> {
  prop::collection::vec((atom_strategy(), separator_strategy()), 2..6).prop_map(|pairs| {
    let atoms: Vec<String> = pairs.iter().map(|(a, _)| a.clone()).collect();
    let mut joined = String::new();
    for (i, (atom, sep)) in pairs.iter().enumerate() {
      if i > 0 {
        joined.push_str(sep);
      }
      joined.push_str(atom);
    }
    (atoms, joined)
  })
}

/// A name with exactly one slash, such as `Acrylates/Dimethicone Copolymer`.
fn slashed_atom_strategy() -> impl Strategy<Value = String> {
  (atom_strategy(), atom_strategy()).prop_map(|(left, right)| format!("{left}/{right}"))
}

/// Three or more atoms joined by `/`, so the name holds at least two slashes.
fn slash_composite_strategy() -> impl Strategy<Value = (Vec<String>, String)> {
  (prop::collection::vec(atom_strategy(), 3..6), prop_oneof![Just("/"), Just(" / ")])
    .prop_map(|(atoms, sep)| {
      let joined = atoms.join(sep);
      (atoms, joined)
    })
}

fn record_strategy() -> impl Strategy<Value = IngredientRecord> {
  (
    prop_oneof![Just("Aqua"), Just(" Aqua"), Just("Glycerin"), Just("Parfum"), Just("AQUA")],
    prop::option::of(0.0f64..=100.0),
  )
    .prop_map(|(name, pct)| IngredientRecord {
      id:         Uuid::new_v4(),
      ingredient: Ingredient { natural_origin_pct: pct, ..Ingredient::new(name) },
    })
}

// ============================================================================
// Splitting
// ============================================================================

proptest! {
  #[test]
  fn atomic_names_split_to_themselves(name in atom_strategy()) {
    prop_assert_eq!(split(&name), vec![name.clone()]);
    prop_assert!(split_composite(&name).is_none());
  }

  #[test]
  fn composite_parts_hold_no_separators((atoms, joined) in composite_strategy()) {
    let parts = split_composite(&joined);
    prop_assert!(parts.is_some());
    let parts = parts.unwrap_or_default();

    for part in &parts {
      prop_assert!(!part.contains([',', '+', '&']));
      prop_assert!(!part.to_lowercase().contains("(and)"));
      prop_assert!(atoms.contains(part));
    }

    let unique: HashSet<&String> = atoms.iter().collect();
    prop_assert_eq!(parts.len(), unique.len());
  }

  #[test]
  fn single_slash_names_split_to_themselves(name in slashed_atom_strategy()) {
    prop_assert_eq!(split(&name), vec![name.clone()]);
    prop_assert!(split_composite(&name).is_none());
  }

  #[test]
  fn single_slash_survives_other_separators(
    slashed in slashed_atom_strategy(),
    other in atom_strategy(),
    sep in separator_strategy(),
  ) {
    prop_assume!(slashed != other);
    let joined = format!("{slashed}{sep}{other}");
    prop_assert_eq!(split_composite(&joined), Some(vec![slashed, other]));
  }

  #[test]
  fn repeated_slashes_separate((atoms, joined) in slash_composite_strategy()) {
    let parts = split_composite(&joined);
    prop_assert!(parts.is_some());
    let parts = parts.unwrap_or_default();

    for part in &parts {
      prop_assert!(!part.contains('/'));
      prop_assert!(atoms.contains(part));
    }

    let unique: HashSet<&String> = atoms.iter().collect();
    prop_assert_eq!(parts.len(), unique.len());
  }

  #[test]
  fn split_parts_are_stable((_, joined) in composite_strategy()) {
    for part in split(&joined) {
      prop_assert_eq!(split(&part), vec![part.clone()]);
    }
  }
}

// ============================================================================
// Grouping
// ============================================================================

proptest! {
  #[test]
  fn survivors_have_unique_names(records in prop::collection::vec(record_strategy(), 0..40)) {
    let plan = group(&records);
    let deleted: HashSet<Uuid> = plan.deletions.iter().copied().collect();

    let mut seen = HashSet::new();
    for record in records.iter().filter(|r| !deleted.contains(&r.id)) {
      prop_assert!(seen.insert(record.ingredient.canonical_name().to_owned()));
    }

    let distinct: HashSet<&str> =
      records.iter().map(|r| r.ingredient.canonical_name()).collect();
    prop_assert_eq!(seen.len(), distinct.len());
  }

  #[test]
  fn grouping_is_deterministic(records in prop::collection::vec(record_strategy(), 0..40)) {
    prop_assert_eq!(group(&records), group(&records));
  }
}
