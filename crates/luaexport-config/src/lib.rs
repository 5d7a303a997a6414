//! Configuration for luaexport analysis runs
//!
//! The configuration lives in `luaexport.toml`. Its location is taken from
//! `LUAEXPORT_CONFIG` when set, otherwise from the platform config directory
//! (`~/.config/luaexport/luaexport.toml` on Unix). A missing file means all
//! defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "LUAEXPORT_CONFIG";

/// Annotation prefix marking strings that belong to this tool
pub const DEFAULT_ANNOTATION_PREFIX: &str = "lua_export_";

/// Error type for loading and saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    Io(PathBuf, std::io::Error),
    /// The file exists but is not valid configuration
    Parse(PathBuf, String),
    /// The configuration could not be rendered as TOML
    Serialize(String),
    /// `set` was called with a key that does not exist
    UnknownKey(String),
    /// `set` was called with a value the key cannot hold
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, err) => write!(f, "{}: {}", path.display(), err),
            ConfigError::Parse(path, msg) => {
                write!(f, "Invalid configuration in {}: {}", path.display(), msg)
            }
            ConfigError::Serialize(msg) => write!(f, "Failed to serialize configuration: {}", msg),
            ConfigError::UnknownKey(key) => write!(f, "Unknown configuration key: {}", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{}' for configuration key '{}'", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Optional traversal diagnostics logging
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_log: Option<String>,
}

impl DiagnosticsConfig {
    pub fn event_log_path(&self) -> PathBuf {
        PathBuf::from(
            self.event_log
                .as_deref()
                .unwrap_or("luaexport-events.log"),
        )
    }

    pub fn stats_log_path(&self) -> PathBuf {
        PathBuf::from(self.stats_log.as_deref().unwrap_or("luaexport-types.log"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub annotation_prefix: String,
    /// Export template specializations even without their own annotation
    pub allow_specializations: bool,
    /// Declarations located under these paths are skipped unless annotated
    pub ignored_path_prefixes: Vec<String>,
    pub vector_templates: Vec<String>,
    pub map_templates: Vec<String>,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            allow_specializations: false,
            ignored_path_prefixes: Vec::new(),
            vector_templates: vec!["std::vector".to_string(), "vector".to_string()],
            map_templates: vec![
                "std::map".to_string(),
                "std::unordered_map".to_string(),
                "map".to_string(),
                "unordered_map".to_string(),
            ],
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        // Honor explicit override for tests / isolated runs.
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();

        base.unwrap_or_else(|| PathBuf::from("."))
            .join("luaexport")
            .join("luaexport.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io(parent.to_path_buf(), e))?;
            }
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "annotation-prefix" => Some(self.annotation_prefix.clone()),
            "allow-specializations" => Some(self.allow_specializations.to_string()),
            "ignored-path-prefixes" => Some(self.ignored_path_prefixes.join(",")),
            "vector-templates" => Some(self.vector_templates.join(",")),
            "map-templates" => Some(self.map_templates.join(",")),
            "diagnostics" => Some(self.diagnostics.enabled.to_string()),
            "event-log" => Some(self.diagnostics.event_log_path().display().to_string()),
            "stats-log" => Some(self.diagnostics.stats_log_path().display().to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "annotation-prefix" => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.annotation_prefix = value.trim().to_string();
            }
            "allow-specializations" => {
                self.allow_specializations = value.parse().map_err(|_| invalid())?;
            }
            "ignored-path-prefixes" => self.ignored_path_prefixes = split_list(value),
            "vector-templates" => self.vector_templates = split_list(value),
            "map-templates" => self.map_templates = split_list(value),
            "diagnostics" => self.diagnostics.enabled = value.parse().map_err(|_| invalid())?,
            "event-log" => self.diagnostics.event_log = Some(value.to_string()),
            "stats-log" => self.diagnostics.stats_log = Some(value.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// All keys with their current values, in display order
    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        [
            "annotation-prefix",
            "allow-specializations",
            "ignored-path-prefixes",
            "vector-templates",
            "map-templates",
            "diagnostics",
            "event-log",
            "stats-log",
        ]
        .into_iter()
        .filter_map(|key| self.get(key).map(|value| (key, value)))
        .collect()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() -> Result<(), ConfigError> {
        let Ok(temp_dir) = TempDir::new() else {
            return Ok(());
        };
        let config = Config::load_from_path(&temp_dir.path().join("absent.toml"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.annotation_prefix, "lua_export_");
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<(), ConfigError> {
        let Ok(temp_dir) = TempDir::new() else {
            return Ok(());
        };
        let path = temp_dir.path().join("luaexport.toml");
        fs::write(
            &path,
            "annotation_prefix = \"script_\"\n\n[diagnostics]\nenabled = true\n",
        )
        .map_err(|e| ConfigError::Io(path.clone(), e))?;

        let config = Config::load_from_path(&path)?;
        assert_eq!(config.annotation_prefix, "script_");
        assert!(config.diagnostics.enabled);
        assert_eq!(config.map_templates.len(), 4);
        assert_eq!(
            config.diagnostics.stats_log_path(),
            PathBuf::from("luaexport-types.log")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("luaexport.toml");
        if fs::write(&path, "allow_specializations = \"sometimes\"").is_err() {
            return;
        }
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse(_, _))
        ));
    }

    #[test]
    fn test_set_and_save_round_trip() -> Result<(), ConfigError> {
        let Ok(temp_dir) = TempDir::new() else {
            return Ok(());
        };
        let path = temp_dir.path().join("nested").join("luaexport.toml");

        let mut config = Config::default();
        config.set("ignored-path-prefixes", "/usr/include, /opt/sdk")?;
        config.set("allow-specializations", "true")?;
        config.save_to_path(&path)?;

        let loaded = Config::load_from_path(&path)?;
        assert_eq!(loaded.ignored_path_prefixes, vec!["/usr/include", "/opt/sdk"]);
        assert!(loaded.allow_specializations);
        Ok(())
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("python-version", "3.12"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set("diagnostics", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config.values_iter().len(), 8);
    }
}
