//! Error types for `lucera-core`.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// A boxed error coming out of an [`IngredientStore`](crate::store::IngredientStore)
/// backend.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read ingredient records: {source}")]
  Fetch {
    #[source]
    source: StoreError,
  },

  #[error(
    "{phase} phase: {op} batch of {} row(s) failed after {attempts} attempt(s): {source}",
    .items.len()
  )]
  Batch {
    phase:    Phase,
    op:       WriteOp,
    /// The identifiers of the failed batch, so the operator can check them
    /// before re-running.
    items:    BatchItems,
    attempts: u32,
    #[source]
    source:   StoreError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Batch context ───────────────────────────────────────────────────────────

/// The pipeline phase a write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Split,
  Group,
  Import,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Split => "split",
      Self::Group => "group",
      Self::Import => "import",
    })
  }
}

/// The kind of batched store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
  Insert,
  Update,
  Delete,
  Upsert,
}

impl fmt::Display for WriteOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Insert => "insert",
      Self::Update => "update",
      Self::Delete => "delete",
      Self::Upsert => "upsert",
    })
  }
}

/// Identifiers of the rows in one write batch. Inserts and upserts have no
/// store id yet, so they are identified by name.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItems {
  Ids(Vec<Uuid>),
  Names(Vec<String>),
}

impl BatchItems {
  pub fn len(&self) -> usize {
    match self {
      Self::Ids(ids) => ids.len(),
      Self::Names(names) => names.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Malformed records ───────────────────────────────────────────────────────

/// Why a record was excluded from normalization. Never fatal: the record is
/// logged, reported, and left untouched in the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
  #[error("missing inci_name")]
  MissingName,

  #[error("natural_origin_pct {0} is outside [0, 100]")]
  PercentOutOfRange(f64),

  /// The store could not turn the row's columns into an ingredient.
  #[error("undecodable row: {0}")]
  Undecodable(String),
}

/// A record skipped during a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecord {
  /// `None` when the stored id itself could not be decoded.
  pub id:     Option<Uuid>,
  pub reason: MalformedReason,
}

impl fmt::Display for MalformedRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.id {
      Some(id) => write!(f, "{id}: {}", self.reason),
      None => write!(f, "<unreadable id>: {}", self.reason),
    }
  }
}
