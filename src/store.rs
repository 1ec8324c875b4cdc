//! Durable persistence for the project index.
//!
//! The whole set of known projects is written as one JSON snapshot keyed by
//! project path. There is no schema version field; an incompatible format
//! change invalidates the file.

use color_eyre::{eyre::eyre, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

use crate::gitlab::types::ProjectSet;

pub struct IndexStore {
  path: PathBuf,
}

impl IndexStore {
  /// Store backed by the snapshot at the default location.
  pub fn open() -> Result<Self> {
    Ok(Self {
      path: Self::default_path()?,
    })
  }

  /// Store backed by an explicit snapshot path.
  pub fn with_path(path: PathBuf) -> Self {
    Self { path }
  }

  /// Get the default snapshot path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("gitlab-ls").join("index.json"))
  }

  /// Load the persisted snapshot as raw entries keyed by project path.
  ///
  /// A missing file is an empty index; an unreadable or malformed file is a
  /// fatal error, not a cache miss.
  pub fn load(&self) -> Result<Map<String, Value>> {
    if !self.path.exists() {
      return Ok(Map::new());
    }

    debug!(path = %self.path.display(), "loading index snapshot");
    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| eyre!("Failed to read index {}: {}", self.path.display(), e))?;

    serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse index {}: {}", self.path.display(), e))
  }

  /// Write the full current project set, overwriting any previous snapshot.
  pub fn save(&self, projects: &ProjectSet) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create index directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(projects)
      .map_err(|e| eyre!("Failed to serialize index: {}", e))?;

    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write index {}: {}", self.path.display(), e))
  }
}
