//! CAS registry number scanning.

use std::sync::LazyLock;

use regex::Regex;

static CAS_NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b\d{1,7}-\d{2}-\d\b").expect("CAS pattern is valid"));

/// Every CAS number in `text`, in order of appearance.
///
/// A single table cell often lists several numbers (`"132-60-5 / 5949-18-8"`);
/// each one is returned.
pub fn find_cas_numbers(text: &str) -> Vec<String> {
  CAS_NUMBER.find_iter(text).map(|m| m.as_str().to_owned()).collect()
}
