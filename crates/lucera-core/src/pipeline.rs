//! The normalization pipeline: split composite names, then collapse
//! duplicates.
//!
//! Each phase reads the whole table, plans its writes in memory, and finishes
//! every write before returning, so the group phase never observes a record
//! mid-split. Both phases are idempotent; after a failure the whole run can be
//! repeated.

use std::{collections::HashSet, future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  error::{BatchItems, MalformedRecord, Phase, WriteOp},
  group::group,
  ingredient::{Ingredient, IngredientRecord, SurvivorUpdate, partition_valid},
  merge::Extract,
  split::split_composite,
  store::{FetchedRecord, IngredientStore, fetch_all},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Paging, batching and retry knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Records per paginated read.
  pub page_size:        usize,
  /// Rows or ids per write request.
  pub batch_size:       usize,
  /// Attempts per write batch before the phase fails.
  pub max_attempts:     u32,
  /// Base delay between attempts; grows linearly with the attempt number.
  pub retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      page_size:        1000,
      batch_size:       100,
      max_attempts:     3,
      retry_backoff_ms: 250,
    }
  }
}

// ─── Split planning ──────────────────────────────────────────────────────────

/// The writes the split phase will issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitPlan {
  /// Composite records to remove once their parts are written.
  pub deletions: Vec<Uuid>,
  /// One row per atomic name, unique by name across the whole plan.
  pub inserts:   Vec<Ingredient>,
}

/// Plan the replacement of every composite record by its atomic parts.
///
/// Each part inherits all non-name fields of the record it came from. When
/// two composite records share a part, the first one provides its fields.
pub fn plan_split(records: &[IngredientRecord]) -> SplitPlan {
  let mut plan = SplitPlan::default();
  let mut staged: HashSet<String> = HashSet::new();

  for record in records {
    let Some(parts) = split_composite(record.inci_name()) else {
      continue;
    };
    plan.deletions.push(record.id);
    for part in parts {
      if staged.insert(part.clone()) {
        plan.inserts.push(record.ingredient.renamed(part));
      }
    }
  }

  plan
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitReport {
  pub scanned:  usize,
  /// Composite records replaced by their parts.
  pub split:    usize,
  pub inserted: usize,
  pub deleted:  usize,
  pub skipped:  Vec<MalformedRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupReport {
  pub scanned:       usize,
  /// Duplicate groups collapsed into a survivor.
  pub merged_groups: usize,
  pub updated:       usize,
  pub deleted:       usize,
  pub skipped:       Vec<MalformedRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub split:       SplitReport,
  pub group:       GroupReport,
}

impl RunReport {
  /// Whether the run changed nothing, i.e. the table was already normalized.
  pub fn is_noop(&self) -> bool {
    self.split.split == 0 && self.group.merged_groups == 0
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Runs the normalization phases against one store.
pub struct Pipeline<'a, S> {
  store:  &'a S,
  config: PipelineConfig,
}

impl<'a, S: IngredientStore> Pipeline<'a, S> {
  pub fn new(store: &'a S, config: PipelineConfig) -> Self { Self { store, config } }

  pub fn config(&self) -> &PipelineConfig { &self.config }

  /// Run the split phase, then the group phase.
  pub async fn run(&self) -> Result<RunReport> {
    let started_at = Utc::now();
    let split = self.split_phase().await?;
    let group = self.group_phase().await?;
    Ok(RunReport { started_at, finished_at: Utc::now(), split, group })
  }

  /// Replace every composite record by one record per atomic part.
  ///
  /// Parts are inserted before the composites are deleted: if the deletes
  /// fail, the leftovers are duplicates the next run collapses, never lost
  /// rows.
  pub async fn split_phase(&self) -> Result<SplitReport> {
    let records = self.fetch().await?;
    let scanned = records.len();
    let (valid, skipped) = partition_valid(records);

    let plan = plan_split(&valid);
    tracing::info!(
      scanned,
      composite = plan.deletions.len(),
      parts = plan.inserts.len(),
      skipped = skipped.len(),
      "planned split phase"
    );

    let store = self.store;
    let inserted = self
      .write_batches(Phase::Split, WriteOp::Insert, &plan.inserts, names, |batch| async move {
        store.insert(batch).await.map(|rows| rows.len())
      })
      .await?;
    let deleted = self
      .write_batches(Phase::Split, WriteOp::Delete, &plan.deletions, ids, |batch| {
        store.delete(batch)
      })
      .await?;

    tracing::info!(split = plan.deletions.len(), inserted, deleted, "split phase complete");
    Ok(SplitReport { scanned, split: plan.deletions.len(), inserted, deleted, skipped })
  }

  /// Collapse records sharing a canonical name into their first record.
  pub async fn group_phase(&self) -> Result<GroupReport> {
    let records = self.fetch().await?;
    let scanned = records.len();
    let (valid, skipped) = partition_valid(records);

    let plan = group(&valid);
    tracing::info!(
      scanned,
      groups = plan.updates.len(),
      duplicates = plan.deletions.len(),
      skipped = skipped.len(),
      "planned group phase"
    );

    let store = self.store;
    let updated = self
      .write_batches(Phase::Group, WriteOp::Update, &plan.updates, survivor_ids, |batch| {
        store.update(batch)
      })
      .await?;
    let deleted = self
      .write_batches(Phase::Group, WriteOp::Delete, &plan.deletions, ids, |batch| {
        store.delete(batch)
      })
      .await?;

    tracing::info!(merged_groups = plan.updates.len(), updated, deleted, "group phase complete");
    Ok(GroupReport {
      scanned,
      merged_groups: plan.updates.len(),
      updated,
      deleted,
      skipped,
    })
  }

  /// Upsert an extract into the store, keyed on `inci_name`.
  pub async fn import(&self, extract: Extract) -> Result<usize> {
    let rows = extract.into_rows();
    let store = self.store;
    let written = self
      .write_batches(Phase::Import, WriteOp::Upsert, &rows, names, |batch| store.upsert(batch))
      .await?;
    tracing::info!(rows = rows.len(), written, "imported extract");
    Ok(written)
  }

  async fn fetch(&self) -> Result<Vec<FetchedRecord>> {
    fetch_all(self.store, self.config.page_size)
      .await
      .map_err(|e| Error::Fetch { source: Box::new(e) })
  }

  /// Issue `rows` in `batch_size` chunks, retrying each chunk up to
  /// `max_attempts` times. Returns the summed per-batch counts.
  async fn write_batches<T, F, Fut>(
    &self,
    phase: Phase,
    op: WriteOp,
    rows: &[T],
    describe: fn(&[T]) -> BatchItems,
    mut write: F,
  ) -> Result<usize>
  where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<usize, S::Error>>,
  {
    let max_attempts = self.config.max_attempts.max(1);
    let mut total = 0;

    for chunk in rows.chunks(self.config.batch_size.max(1)) {
      let mut attempt = 1;
      loop {
        match write(chunk.to_vec()).await {
          Ok(n) => {
            tracing::debug!(%phase, %op, rows = chunk.len(), written = n, "batch written");
            total += n;
            break;
          }
          Err(e) if attempt < max_attempts => {
            tracing::warn!(%phase, %op, attempt, error = %e, "batch failed, retrying");
            let backoff = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
            tokio::time::sleep(Duration::from_millis(backoff)).await;
            attempt += 1;
          }
          Err(e) => {
            return Err(Error::Batch {
              phase,
              op,
              items: describe(chunk),
              attempts: attempt,
              source: Box::new(e),
            });
          }
        }
      }
    }

    Ok(total)
  }
}

fn ids(batch: &[Uuid]) -> BatchItems { BatchItems::Ids(batch.to_vec()) }

fn survivor_ids(batch: &[SurvivorUpdate]) -> BatchItems {
  BatchItems::Ids(batch.iter().map(|u| u.id).collect())
}

fn names(batch: &[Ingredient]) -> BatchItems {
  BatchItems::Names(batch.iter().map(|i| i.inci_name.clone()).collect())
}
