//! Canonical grouping and field aggregation.
//!
//! Records sharing a canonical name collapse into one survivor. The survivor
//! is the first record of its group in input order; only
//! `natural_origin_pct` and `restriction` are recomputed for it; booleans,
//! SIN flags and `data_source` are left exactly as the survivor had them.

use std::collections::HashMap;

use uuid::Uuid;

use crate::ingredient::{AggregatedFields, IngredientRecord, SurvivorUpdate, TagSet, non_empty};

/// The writes needed to make canonical names unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPlan {
  /// One entry per duplicate group, in order of first appearance.
  pub updates:   Vec<SurvivorUpdate>,
  /// Every non-survivor id, listed group by group.
  pub deletions: Vec<Uuid>,
}

impl GroupPlan {
  pub fn is_empty(&self) -> bool { self.updates.is_empty() && self.deletions.is_empty() }
}

/// Partition `records` by trimmed `inci_name` (exact, case-sensitive) and plan
/// the survivor updates and deletions for every group of two or more.
///
/// Groups are visited in order of first appearance, so the same input order
/// always yields the same plan.
pub fn group(records: &[IngredientRecord]) -> GroupPlan {
  let mut index: HashMap<&str, usize> = HashMap::new();
  let mut groups: Vec<Vec<&IngredientRecord>> = Vec::new();

  for record in records {
    let key = record.ingredient.canonical_name();
    match index.get(key) {
      Some(&i) => groups[i].push(record),
      None => {
        index.insert(key, groups.len());
        groups.push(vec![record]);
      }
    }
  }

  let mut plan = GroupPlan::default();
  for members in groups.iter().filter(|g| g.len() > 1) {
    let survivor = members[0];
    plan.updates.push(SurvivorUpdate {
      id:     survivor.id,
      fields: aggregate(members),
    });
    plan.deletions.extend(members[1..].iter().map(|r| r.id));
  }
  plan
}

/// Merge the aggregated fields of one group.
///
/// - `natural_origin_pct`: mean of the values present, `None` if there are
///   none. Missing values are not counted as zero.
/// - `restriction`: union of every present set, `None` if the union is empty.
pub fn aggregate(group: &[&IngredientRecord]) -> AggregatedFields {
  let pcts: Vec<f64> = group
    .iter()
    .filter_map(|r| r.ingredient.natural_origin_pct)
    .collect();
  let natural_origin_pct = if pcts.is_empty() {
    None
  } else {
    Some(pcts.iter().sum::<f64>() / pcts.len() as f64)
  };

  let restriction: TagSet = group
    .iter()
    .filter_map(|r| r.ingredient.restriction.as_ref())
    .flatten()
    .cloned()
    .collect();

  AggregatedFields {
    natural_origin_pct,
    restriction: non_empty(restriction),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ingredient::Ingredient;

  fn record(name: &str, pct: Option<f64>, restriction: Option<&[&str]>) -> IngredientRecord {
    let mut ingredient = Ingredient::new(name);
    ingredient.natural_origin_pct = pct;
    ingredient.restriction = restriction.map(|r| r.iter().map(|s| s.to_string()).collect());
    IngredientRecord { id: Uuid::new_v4(), ingredient }
  }

  fn tags(items: &[&str]) -> TagSet { items.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn mean_ignores_missing_values() {
    let rs = [
      record("Aqua", Some(10.0), None),
      record("Aqua", Some(20.0), None),
      record("Aqua", None, None),
    ];
    let refs: Vec<_> = rs.iter().collect();
    assert_eq!(aggregate(&refs).natural_origin_pct, Some(15.0));
  }

  #[test]
  fn mean_is_none_without_values() {
    let rs = [record("Aqua", None, None), record("Aqua", None, None)];
    let refs: Vec<_> = rs.iter().collect();
    assert_eq!(aggregate(&refs).natural_origin_pct, None);
  }

  #[test]
  fn restriction_union() {
    let rs = [
      record("Aqua", None, Some(&["A"])),
      record("Aqua", None, Some(&["B", "A"])),
      record("Aqua", None, None),
    ];
    let refs: Vec<_> = rs.iter().collect();
    assert_eq!(aggregate(&refs).restriction, Some(tags(&["A", "B"])));
  }

  #[test]
  fn empty_restriction_union_is_none() {
    let rs = [record("Aqua", None, Some(&[])), record("Aqua", None, None)];
    let refs: Vec<_> = rs.iter().collect();
    assert_eq!(aggregate(&refs).restriction, None);
  }

  #[test]
  fn singletons_are_untouched() {
    let rs = [record("Aqua", Some(1.0), None), record("Glycerin", None, None)];
    assert!(group(&rs).is_empty());
  }

  #[test]
  fn first_record_survives() {
    let rs = [
      record("Glycerin", Some(40.0), None),
      record("Aqua", None, None),
      record("Glycerin", Some(60.0), Some(&["leave-on"])),
      record(" Glycerin ", None, None),
    ];
    let plan = group(&rs);

    assert_eq!(plan.updates.len(), 1);
    assert_eq!(plan.updates[0].id, rs[0].id);
    assert_eq!(plan.updates[0].fields.natural_origin_pct, Some(50.0));
    assert_eq!(plan.updates[0].fields.restriction, Some(tags(&["leave-on"])));
    assert_eq!(plan.deletions, vec![rs[2].id, rs[3].id]);
  }

  #[test]
  fn grouping_is_case_sensitive() {
    let rs = [record("Aqua", None, None), record("AQUA", None, None)];
    assert!(group(&rs).is_empty());
  }

  #[test]
  fn groups_follow_first_appearance() {
    let rs = [
      record("B", None, None),
      record("A", None, None),
      record("A", None, None),
      record("B", None, None),
    ];
    let plan = group(&rs);
    let ids: Vec<_> = plan.updates.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![rs[0].id, rs[1].id]);
    assert_eq!(plan.deletions, vec![rs[3].id, rs[2].id]);
  }
}
