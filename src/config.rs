use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub gitlab: GitlabConfig,
  /// Project paths (path_with_namespace) to keep indexed
  #[serde(default)]
  pub projects: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabConfig {
  /// Base URL of the GitLab instance, e.g. https://gitlab.com
  pub url: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./gitlab-ls.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/gitlab-ls/config.yaml
  /// 4. ~/.config/gitlab-ls/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/gitlab-ls/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("gitlab-ls.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("gitlab-ls").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the GitLab API token from environment variables.
  ///
  /// Checks GITLAB_LS_TOKEN first, then GITLAB_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("GITLAB_LS_TOKEN")
      .or_else(|_| std::env::var("GITLAB_TOKEN"))
      .map_err(|_| {
        eyre!("GitLab token not found. Set GITLAB_LS_TOKEN or GITLAB_TOKEN environment variable.")
      })
  }
}
