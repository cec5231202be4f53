use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL of the hosted backend, e.g. https://project.example.co
  pub url: String,
  /// Table holding the user's writings
  #[serde(default = "default_table")]
  pub table: String,
}

fn default_table() -> String {
  "user_writings".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// Override for the persisted store's database path
  pub db_path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./quillbox.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/quillbox/config.yaml
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
        "No configuration file found. Create one at ~/.config/quillbox/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("quillbox.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("quillbox").join("config.yaml");
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

  /// Get the backend service api key from the environment.
  pub fn get_api_key() -> Result<String> {
    std::env::var("QUILLBOX_API_KEY")
      .map_err(|_| eyre!("Backend api key not found. Set QUILLBOX_API_KEY environment variable."))
  }

  /// Get the signed-in user's access token from the environment.
  pub fn get_access_token() -> Result<String> {
    std::env::var("QUILLBOX_ACCESS_TOKEN").map_err(|_| {
      eyre!("Access token not found. Set QUILLBOX_ACCESS_TOKEN environment variable.")
    })
  }
}
