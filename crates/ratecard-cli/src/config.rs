//! Layered settings: an optional TOML file, then `RATECARD_*` environment
//! variables. Command-line flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// File read when `--config` is not given; missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "ratecard.toml";

/// Shape of the settings after all sources are merged.
#[derive(Debug, Deserialize)]
pub struct Settings {
  /// Path of the SQLite file holding the store.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("ratecard.db") }

impl Settings {
  /// Load settings. An explicitly named file must exist; the default file is
  /// optional.
  pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
    let (path, required) = match file {
      Some(path) => (path.to_path_buf(), true),
      None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    config::Config::builder()
      .add_source(config::File::from(path.clone()).required(required))
      .add_source(config::Environment::with_prefix("RATECARD"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_store_path_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ratecard.toml");
    std::fs::write(&file, "store_path = \"/var/lib/ratecard/rates.db\"\n").unwrap();

    let settings = Settings::load(Some(&file)).unwrap();
    assert_eq!(settings.store_path, PathBuf::from("/var/lib/ratecard/rates.db"));
  }

  #[test]
  fn named_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/rates.db")), PathBuf::from(home).join("rates.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/rates.db")), PathBuf::from("/tmp/rates.db"));
  }
}
