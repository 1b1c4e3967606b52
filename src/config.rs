use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const MIN_CARD_WIDTH: u16 = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid assistant token {token:?}: {source}")]
    Pattern {
        token: String,
        #[source]
        source: regex::Error,
    },
}

/// Runtime settings, read from `<config dir>/gmon/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between refresh passes
    pub refresh_interval_secs: u64,
    /// Fixed width of each session card
    pub card_width: u16,
    /// Substring identifying the terminal application executable
    pub app_marker: String,
    /// Substring identifying the login wrapper spawned per tab
    pub login_marker: String,
    /// Shell names accepted under a login wrapper
    pub shell_names: Vec<String>,
    /// Word that names the assistant command
    pub assistant_token: String,
    /// Substring that disqualifies an assistant match (the desktop app bundle)
    pub assistant_exclude: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 2,
            card_width: 40,
            app_marker: "Ghostty.app".to_string(),
            login_marker: "login".to_string(),
            shell_names: vec!["zsh".to_string(), "bash".to_string()],
            assistant_token: "claude".to_string(),
            assistant_exclude: "Claude.app".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gmon").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(raw)?;
        config.refresh_interval_secs = config.refresh_interval_secs.max(1);
        config.card_width = config.card_width.max(MIN_CARD_WIDTH);
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = MonitorConfig::from_toml("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_override_and_clamping() {
        let config = MonitorConfig::from_toml(
            r#"
refresh_interval_secs = 0
card_width = 4
assistant_token = "codex"
shell_names = ["fish"]
"#,
        )
        .unwrap();
        assert_eq!(config.refresh_interval_secs, 1);
        assert_eq!(config.card_width, MIN_CARD_WIDTH);
        assert_eq!(config.assistant_token, "codex");
        assert_eq!(config.shell_names, vec!["fish".to_string()]);
        assert_eq!(config.app_marker, "Ghostty.app");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(MonitorConfig::from_toml("card_width = \"wide\"").is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = MonitorConfig::from_file(Path::new("/nonexistent/gmon/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
