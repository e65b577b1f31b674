//! Name splitter: composite INCI strings into atomic names.
//!
//! Sources list blends as one string (`"Aqua, Glycerin"`,
//! `"Cocamidopropyl Betaine (and) Sodium Chloride"`). Recognised separators
//! are `,`, `+`, `&` and the marker `(and)` in any case. A `/` only counts as
//! a separator when the name contains more than one of them: a single slash is
//! usually part of the name itself (ratios, copolymers), while two or more
//! almost always list alternatives. That rule is a heuristic, not chemistry.

use std::sync::LazyLock;

use regex::Regex;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\s*\(and\)\s*|\s*[,+&]\s*").expect("valid separator pattern")
});

static SEPARATORS_WITH_SLASH: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\s*\(and\)\s*|\s*[,+&/]\s*").expect("valid separator pattern")
});

fn separators_for(name: &str) -> &'static Regex {
  if name.matches('/').count() > 1 {
    &*SEPARATORS_WITH_SLASH
  } else {
    &*SEPARATORS
  }
}

/// Trimmed, non-empty parts in order of appearance, duplicates included.
fn raw_parts(name: &str) -> Vec<&str> {
  separators_for(name)
    .split(name)
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect()
}

fn dedup_in_order(parts: Vec<&str>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(parts.len());
  for part in parts {
    if !out.iter().any(|seen| seen == part) {
      out.push(part.to_owned());
    }
  }
  out
}

/// Split `name` into its atomic parts.
///
/// An atomic name comes back as a single trimmed part; a blank name yields no
/// parts at all.
pub fn split(name: &str) -> Vec<String> { dedup_in_order(raw_parts(name)) }

/// Split `name` only if it is composite.
///
/// Returns `None` when the name has at most one non-empty part, meaning the
/// record must be left alone. The decision is made before de-duplication, so
/// `"Aqua, Aqua"` is still a split (into `["Aqua"]`).
pub fn split_composite(name: &str) -> Option<Vec<String>> {
  let parts = raw_parts(name);
  if parts.len() <= 1 {
    return None;
  }
  Some(dedup_in_order(parts))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn atomic_name_is_returned_trimmed() {
    assert_eq!(split("  Glycerin "), ["Glycerin"]);
    assert_eq!(split_composite("Glycerin"), None);
  }

  #[test]
  fn blank_name_has_no_parts() {
    assert!(split("  ").is_empty());
    assert_eq!(split_composite(" , "), None);
  }

  #[test]
  fn splits_on_comma_plus_and_ampersand() {
    assert_eq!(
      split_composite("Aqua, Glycerin + Parfum & Limonene"),
      Some(vec![
        "Aqua".to_owned(),
        "Glycerin".to_owned(),
        "Parfum".to_owned(),
        "Limonene".to_owned(),
      ])
    );
  }

  #[test]
  fn and_marker_is_case_insensitive() {
    assert_eq!(
      split("Cocamidopropyl Betaine (and) Sodium Chloride (AND) Aqua"),
      ["Cocamidopropyl Betaine", "Sodium Chloride", "Aqua"]
    );
    assert_eq!(split("Aqua (And) Glycerin"), ["Aqua", "Glycerin"]);
  }

  #[test]
  fn plain_word_and_is_not_a_separator() {
    assert_eq!(split("Sand and Clay"), ["Sand and Clay"]);
  }

  #[test]
  fn single_slash_is_kept() {
    assert_eq!(
      split_composite("Acrylates/C10-30 Alkyl Acrylate Crosspolymer"),
      None
    );
    assert_eq!(
      split("Acrylates/Dimethicone Copolymer, Aqua"),
      ["Acrylates/Dimethicone Copolymer", "Aqua"]
    );
  }

  #[test]
  fn two_or_more_slashes_split() {
    assert_eq!(
      split("Citric Acid / Sodium Citrate / Lactic Acid"),
      ["Citric Acid", "Sodium Citrate", "Lactic Acid"]
    );
  }

  #[test]
  fn duplicates_are_removed_but_still_count_as_a_split() {
    assert_eq!(split_composite("Aqua, Aqua"), Some(vec!["Aqua".to_owned()]));
    assert_eq!(split("Aqua, Glycerin, Aqua"), ["Aqua", "Glycerin"]);
  }

  #[test]
  fn empty_segments_are_dropped() {
    assert_eq!(split(",Aqua,, ,Glycerin,"), ["Aqua", "Glycerin"]);
  }
}
