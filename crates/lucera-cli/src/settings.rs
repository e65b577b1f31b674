//! Layered configuration: an optional TOML file under `LUCERA__*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use lucera_core::pipeline::PipelineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite file holding `ingredient_master`. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  #[serde(default)]
  pub pipeline: PipelineConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("lucera.db") }

impl Settings {
  /// Load from `path` (missing is fine) and the environment, e.g.
  /// `LUCERA__PIPELINE__BATCH_SIZE=50`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LUCERA").prefix_separator("__").separator("__"))
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    let mut loaded: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    loaded.store_path = expand_tilde(&loaded.store_path);
    Ok(loaded)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
