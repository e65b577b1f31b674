//! SQL schema for the Lucera SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Upstream collaborators write raw rows here, so inci_name may be NULL or
-- repeated until the normalization pipeline has run.
CREATE TABLE IF NOT EXISTS ingredient_master (
    id                          TEXT PRIMARY KEY,
    inci_name                   TEXT,
    natural_origin_pct          REAL,
    restriction                 TEXT,             -- JSON array or NULL
    is_eu_banned                INTEGER NOT NULL DEFAULT 0,
    is_eu_restricted            INTEGER NOT NULL DEFAULT 0,
    is_sin_list                 INTEGER NOT NULL DEFAULT 0,
    is_nanomaterial             INTEGER NOT NULL DEFAULT 0,
    is_nanomaterial_whitelisted INTEGER NOT NULL DEFAULT 0,
    sin_list_flags              TEXT,             -- JSON array or NULL
    data_source                 TEXT
);

CREATE INDEX IF NOT EXISTS ingredient_name_idx ON ingredient_master(inci_name);

PRAGMA user_version = 1;
";
