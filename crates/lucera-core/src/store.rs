//! The `IngredientStore` trait and pagination helpers.
//!
//! The trait is implemented by storage backends (e.g. `lucera-store-sqlite`).
//! The pipeline driver depends on this abstraction, never on a concrete
//! backend, so a store instance always arrives as an explicit argument.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::MalformedRecord,
  ingredient::{Ingredient, IngredientRecord, SurvivorUpdate},
};

/// One stored row as read: decoded, or reported as malformed so that a single
/// bad row never fails the page it sits on.
pub type FetchedRecord = Result<IngredientRecord, MalformedRecord>;

/// Abstraction over the table holding the canonical ingredient rows.
///
/// Every write takes a whole batch; callers keep batches small enough for
/// the backend's request limits. All methods return `Send` futures so the
/// trait can be used from multi-threaded async runtimes.
pub trait IngredientStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read up to `limit` rows starting at `offset`.
  ///
  /// The order must be stable across calls: it decides which record of a
  /// duplicate group survives. A row whose columns cannot be decoded is
  /// returned in place as an `Err`; it still counts towards `limit`.
  fn fetch_page(
    &self,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<FetchedRecord>, Self::Error>> + Send + '_;

  /// Persist new rows and return them with their assigned ids.
  fn insert(
    &self,
    rows: Vec<Ingredient>,
  ) -> impl Future<Output = Result<Vec<IngredientRecord>, Self::Error>> + Send + '_;

  /// Overwrite the aggregated fields of existing rows. Returns the number of
  /// rows changed.
  fn update(
    &self,
    updates: Vec<SurvivorUpdate>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Remove rows by id. Unknown ids are ignored. Returns the number removed.
  fn delete(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert rows, folding each into any existing row with the same
  /// `inci_name` as [`Ingredient::absorb`] does: booleans are OR-ed and
  /// absent fields keep their stored value. Returns the number of rows
  /// written.
  fn upsert(
    &self,
    rows: Vec<Ingredient>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

/// Read the whole table, one page at a time, until a short page signals the
/// end.
pub async fn fetch_all<S: IngredientStore>(
  store: &S,
  page_size: usize,
) -> Result<Vec<FetchedRecord>, S::Error> {
  let page_size = page_size.max(1);
  let mut all = Vec::new();
  let mut offset = 0;

  loop {
    let page = store.fetch_page(offset, page_size).await?;
    let len = page.len();
    all.extend(page);
    if len < page_size {
      break;
    }
    offset += page_size;
  }

  tracing::debug!(records = all.len(), page_size, "fetched ingredient table");
  Ok(all)
}
