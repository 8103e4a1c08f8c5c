use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::version::DEFAULT_AUTHOR;

/// User-level settings for a tracebench session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Recorded as the author of every saved version
    #[serde(default = "default_author")]
    pub author: String,

    /// How often a scheduler should call auto-save, in seconds
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,

    /// Artifact file used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workspace: Option<String>,
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

/// Default value for autosave_interval_secs (five minutes)
fn default_autosave_interval() -> u64 {
    300
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
            autosave_interval_secs: default_autosave_interval(),
            default_workspace: None,
        }
    }
}

impl TraceConfig {
    /// Loads the config from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the config, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            log::debug!("No config at {:?}, using defaults", path.as_ref());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if TRACEBENCH_CONFIG environment variable is set
    if let Ok(path) = std::env::var("TRACEBENCH_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.tracebench.yaml
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".tracebench.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = TraceConfig::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, TraceConfig::default());
        assert_eq!(config.author, DEFAULT_AUTHOR);
        assert_eq!(config.autosave_interval_secs, 300);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "author: qa-lead\n").unwrap();

        let config = TraceConfig::load(&path).unwrap();
        assert_eq!(config.author, "qa-lead");
        assert_eq!(config.autosave_interval_secs, 300);
        assert!(config.default_workspace.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = TraceConfig {
            author: "tester".into(),
            autosave_interval_secs: 60,
            default_workspace: Some("login.yaml".into()),
        };

        config.save(&path).unwrap();
        assert_eq!(TraceConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "autosave_interval_secs: [not a number").unwrap();

        let err = TraceConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
