//! CLI configuration: optional defaults for the account the commands act on.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::{Error, Result};

/// Values the CLI falls back to when flags are not given.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Account name to log in with.
    pub username: Option<String>,
    /// Path to the guard secrets file.
    pub guard_file: Option<String>,
    /// Web API key for the trade endpoints.
    pub api_key: Option<String>,
}

impl Config {
    /// Load the config from `path`, or from the default location when no
    /// path is given. A missing file is not an error; it yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("steamrs").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/steamrs.toml"))).unwrap();
        assert!(config.username.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("steamrs-config-test.toml");
        std::fs::write(&path, "username = \"gaben\"\napi_key = \"KEY\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.username.as_deref(), Some("gaben"));
        assert_eq!(config.api_key.as_deref(), Some("KEY"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let path = std::env::temp_dir().join("steamrs-config-bad.toml");
        std::fs::write(&path, "username = [not toml").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(Error::Config(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
