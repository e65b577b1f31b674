//! [`SqliteStore`], the SQLite implementation of [`IngredientStore`].

use std::path::Path;

use uuid::Uuid;

use lucera_core::{
  ingredient::{Ingredient, IngredientRecord, SurvivorUpdate},
  store::{FetchedRecord, IngredientStore},
};

use crate::{
  Result,
  encode::{EncodedIngredient, RawIngredient, UnreadableRow, encode_tags, encode_uuid},
  schema::SCHEMA,
};

const SELECT_PAGE: &str = "
SELECT id, inci_name, natural_origin_pct, restriction,
       is_eu_banned, is_eu_restricted, is_sin_list,
       is_nanomaterial, is_nanomaterial_whitelisted,
       sin_list_flags, data_source
FROM ingredient_master
ORDER BY rowid
LIMIT ?1 OFFSET ?2";

const INSERT_ROW: &str = "
INSERT INTO ingredient_master (
  id, inci_name, natural_origin_pct, restriction,
  is_eu_banned, is_eu_restricted, is_sin_list,
  is_nanomaterial, is_nanomaterial_whitelisted,
  sin_list_flags, data_source
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

// Flags only ever turn on; absent values keep what is stored.
const ABSORB_BY_NAME: &str = "
UPDATE ingredient_master SET
  natural_origin_pct          = COALESCE(?2, natural_origin_pct),
  restriction                 = COALESCE(?3, restriction),
  is_eu_banned                = is_eu_banned OR ?4,
  is_eu_restricted            = is_eu_restricted OR ?5,
  is_sin_list                 = is_sin_list OR ?6,
  is_nanomaterial             = is_nanomaterial OR ?7,
  is_nanomaterial_whitelisted = is_nanomaterial_whitelisted OR ?8,
  sin_list_flags              = COALESCE(?9, sin_list_flags),
  data_source                 = COALESCE(?10, data_source)
WHERE inci_name = ?1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// The ingredient table backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── IngredientStore impl ────────────────────────────────────────────────────

impl IngredientStore for SqliteStore {
  type Error = crate::Error;

  async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FetchedRecord>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset_val = i64::try_from(offset).unwrap_or(i64::MAX);

    let raws: Vec<Result<RawIngredient, UnreadableRow>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(SELECT_PAGE)?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawIngredient::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raws
        .into_iter()
        .map(|raw| match raw {
          Ok(raw) => raw.into_fetched(),
          Err(bad) => Err(bad.into_malformed()),
        })
        .collect(),
    )
  }

  async fn insert(&self, rows: Vec<Ingredient>) -> Result<Vec<IngredientRecord>> {
    let records: Vec<IngredientRecord> = rows
      .into_iter()
      .map(|ingredient| IngredientRecord { id: Uuid::new_v4(), ingredient })
      .collect();

    let encoded = records
      .iter()
      .map(|r| -> Result<_> { Ok((encode_uuid(r.id), EncodedIngredient::new(&r.ingredient)?)) })
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(INSERT_ROW)?;
          for (id, row) in &encoded {
            stmt.execute(rusqlite::params![
              id,
              row.inci_name,
              row.natural_origin_pct,
              row.restriction,
              row.is_eu_banned,
              row.is_eu_restricted,
              row.is_sin_list,
              row.is_nanomaterial,
              row.is_nanomaterial_whitelisted,
              row.sin_list_flags,
              row.data_source,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(rows = records.len(), "inserted ingredient rows");
    Ok(records)
  }

  async fn update(&self, updates: Vec<SurvivorUpdate>) -> Result<usize> {
    let encoded = updates
      .iter()
      .map(|u| -> Result<_> {
        Ok((
          encode_uuid(u.id),
          u.fields.natural_origin_pct,
          encode_tags(u.fields.restriction.as_ref())?,
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE ingredient_master
             SET natural_origin_pct = ?2, restriction = ?3
             WHERE id = ?1",
          )?;
          for (id, pct, restriction) in &encoded {
            changed += stmt.execute(rusqlite::params![id, pct, restriction])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    Ok(changed)
  }

  async fn delete(&self, ids: Vec<Uuid>) -> Result<usize> {
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut stmt = tx.prepare("DELETE FROM ingredient_master WHERE id = ?1")?;
          for id in &id_strs {
            removed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }

  async fn upsert(&self, rows: Vec<Ingredient>) -> Result<usize> {
    let encoded = rows
      .iter()
      .map(|ingredient| -> Result<_> {
        Ok((encode_uuid(Uuid::new_v4()), EncodedIngredient::new(ingredient)?))
      })
      .collect::<Result<Vec<_>>>()?;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut absorb = tx.prepare(ABSORB_BY_NAME)?;
          let mut insert = tx.prepare(INSERT_ROW)?;
          for (id, row) in &encoded {
            let matched = absorb.execute(rusqlite::params![
              row.inci_name,
              row.natural_origin_pct,
              row.restriction,
              row.is_eu_banned,
              row.is_eu_restricted,
              row.is_sin_list,
              row.is_nanomaterial,
              row.is_nanomaterial_whitelisted,
              row.sin_list_flags,
              row.data_source,
            ])?;
            if matched == 0 {
              insert.execute(rusqlite::params![
                id,
                row.inci_name,
                row.natural_origin_pct,
                row.restriction,
                row.is_eu_banned,
                row.is_eu_restricted,
                row.is_sin_list,
                row.is_nanomaterial,
                row.is_nanomaterial_whitelisted,
                row.sin_list_flags,
                row.data_source,
              ])?;
            }
          }
        }
        tx.commit()?;
        Ok(encoded.len())
      })
      .await?;

    Ok(written)
  }
}
