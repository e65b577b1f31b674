//! `lucera`: normalize and deduplicate the ingredient table.
//!
//! # Usage
//!
//! ```
//! lucera convert --source cosing-prohibited --input annex-ii.txt --out prohibited.csv
//! lucera convert --source chemsec-sin-list --input sin.csv --out sin-extract.csv
//! lucera merge --primary prohibited.csv --secondary sin-extract.csv --out combined.csv
//! lucera import combined.csv
//! lucera normalize
//! lucera export --out ingredients.csv
//! ```
//!
//! Settings come from `lucera.toml` (or `--config`) and `LUCERA__*`
//! environment variables; see [`settings::Settings`].

mod settings;

use std::{
  fs::File,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lucera_core::{
  error::MalformedRecord,
  ingredient::partition_valid,
  merge::{Extract, merge},
  pipeline::{GroupReport, Pipeline, SplitReport},
  store::{FetchedRecord, fetch_all},
};
use lucera_extract::{ParsedExtract, source::Source};
use lucera_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lucera", version, about = "Ingredient normalization and deduplication")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "lucera.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Split composite names, then collapse duplicates.
  Normalize,
  /// Only replace composite names by their atomic parts.
  Split,
  /// Only collapse records sharing a canonical name.
  Dedupe,
  /// Combine two extracts; names in both take the secondary's SIN-list flags.
  Merge {
    #[arg(long, value_name = "CSV")]
    primary:   PathBuf,
    #[arg(long, value_name = "CSV")]
    secondary: PathBuf,
    #[arg(long, value_name = "CSV")]
    out:       PathBuf,
  },
  /// Upsert an extract into the store by name.
  Import {
    #[arg(value_name = "CSV")]
    extract: PathBuf,
  },
  /// Write the store contents as an extract.
  Export {
    #[arg(long, value_name = "CSV")]
    out: PathBuf,
  },
  /// Turn a raw registry dump into an extract.
  Convert {
    /// cosing-prohibited, chemsec-sin-list or cosmos-approved.
    #[arg(long)]
    source: Source,
    #[arg(long, value_name = "FILE")]
    input:  PathBuf,
    #[arg(long, value_name = "CSV")]
    out:    PathBuf,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Normalize => {
      let (settings, store) = open_store(&cli.config).await?;
      let report = Pipeline::new(&store, settings.pipeline)
        .run()
        .await
        .context("normalization failed")?;
      print_split(&report.split);
      print_group(&report.group);
      let elapsed = (report.finished_at - report.started_at).num_milliseconds();
      if report.is_noop() {
        println!("already normalized ({elapsed} ms)");
      } else {
        println!("done in {elapsed} ms");
      }
    }
    Command::Split => {
      let (settings, store) = open_store(&cli.config).await?;
      let report = Pipeline::new(&store, settings.pipeline)
        .split_phase()
        .await
        .context("split phase failed")?;
      print_split(&report);
    }
    Command::Dedupe => {
      let (settings, store) = open_store(&cli.config).await?;
      let report = Pipeline::new(&store, settings.pipeline)
        .group_phase()
        .await
        .context("group phase failed")?;
      print_group(&report);
    }
    Command::Merge { primary, secondary, out } => {
      let primary = read_extract(&primary)?;
      let secondary = read_extract(&secondary)?;
      let outcome = merge(primary, secondary);
      write_extract(&out, &outcome.merged)?;

      let stats = outcome.stats;
      println!(
        "merged {} rows ({} primary only, {} secondary only, {} in both) into {}",
        stats.total,
        stats.primary_only,
        stats.secondary_only,
        stats.conflicts,
        out.display()
      );
    }
    Command::Import { extract } => {
      let extract = read_extract(&extract)?;
      let (settings, store) = open_store(&cli.config).await?;
      let written = Pipeline::new(&store, settings.pipeline)
        .import(extract)
        .await
        .context("import failed")?;
      println!("upserted {written} rows");
    }
    Command::Export { out } => {
      let (settings, store) = open_store(&cli.config).await?;
      let records = fetch_all(&store, settings.pipeline.page_size)
        .await
        .context("failed to read the ingredient table")?;
      let (extract, dropped) = export_rows(records);
      write_extract(&out, &extract)?;

      for bad in &dropped.malformed {
        eprintln!("  {bad}");
      }
      println!(
        "exported {} rows to {} ({} malformed, {} duplicate names left out)",
        extract.len(),
        out.display(),
        dropped.malformed.len(),
        dropped.duplicates
      );
    }
    Command::Convert { source, input, out } => {
      let file =
        File::open(&input).with_context(|| format!("failed to open {}", input.display()))?;
      let parsed = lucera_extract::source::read_raw(source, file)
        .with_context(|| format!("failed to convert {source} dump {}", input.display()))?;
      print_skipped(&parsed);
      write_extract(&out, &parsed.extract)?;
      println!("wrote {} {source} rows to {}", parsed.extract.len(), out.display());
    }
  }

  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn open_store(config: &Path) -> anyhow::Result<(Settings, SqliteStore)> {
  let settings = Settings::load(config)?;
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  Ok((settings, store))
}

fn read_extract(path: &Path) -> anyhow::Result<Extract> {
  let parsed = lucera_extract::read_extract_path(path)
    .with_context(|| format!("failed to read extract {}", path.display()))?;
  print_skipped(&parsed);
  Ok(parsed.extract)
}

fn write_extract(path: &Path, extract: &Extract) -> anyhow::Result<()> {
  lucera_extract::write_extract_path(path, extract)
    .with_context(|| format!("failed to write extract {}", path.display()))
}

/// Rows of the table that did not make it into an export.
#[derive(Debug, Default)]
struct Dropped {
  /// Undecodable rows and rows without a name.
  malformed:  Vec<MalformedRecord>,
  /// Later rows whose name was already exported.
  duplicates: usize,
}

fn export_rows(records: Vec<FetchedRecord>) -> (Extract, Dropped) {
  let (valid, malformed) = partition_valid(records);
  let readable = valid.len();
  let extract: Extract = valid.into_iter().collect();
  let dropped = Dropped { malformed, duplicates: readable - extract.len() };

  if !dropped.malformed.is_empty() || dropped.duplicates > 0 {
    tracing::warn!(
      malformed = dropped.malformed.len(),
      duplicates = dropped.duplicates,
      "rows left out of the export"
    );
  }
  (extract, dropped)
}

fn print_skipped(parsed: &ParsedExtract) {
  for skipped in &parsed.skipped {
    eprintln!("  line {}: {}", skipped.line, skipped.issue);
  }
}

fn print_split(report: &SplitReport) {
  println!(
    "split: scanned {}, split {}, inserted {}, deleted {}, skipped {}",
    report.scanned,
    report.split,
    report.inserted,
    report.deleted,
    report.skipped.len()
  );
  for skipped in &report.skipped {
    eprintln!("  {skipped}");
  }
}

fn print_group(report: &GroupReport) {
  println!(
    "dedupe: scanned {}, merged groups {}, updated {}, deleted {}, skipped {}",
    report.scanned,
    report.merged_groups,
    report.updated,
    report.deleted,
    report.skipped.len()
  );
  for skipped in &report.skipped {
    eprintln!("  {skipped}");
  }
}
