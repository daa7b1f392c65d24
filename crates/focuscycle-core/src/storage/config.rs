//! TOML-based application configuration.
//!
//! Stores:
//! - Phase generation settings (work/break lengths, long break cadence, tail)
//! - Completion feedback (sounds, vibration)
//!
//! Configuration is stored at `~/.config/focuscycle/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::cycle::PhaseSettings;
use crate::error::ConfigError;
use crate::settings::CycleSettings;

/// Completion feedback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Sound played when a focus phase completes (path or name).
    #[serde(default)]
    pub focus_sound: Option<String>,
    /// Sound played when a break completes.
    #[serde(default)]
    pub break_sound: Option<String>,
    #[serde(default = "default_true")]
    pub vibration: bool,
    /// Ring the terminal bell on completion (CLI only).
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focuscycle/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cycle: PhaseSettings,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

fn default_true() -> bool {
    true
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            focus_sound: None,
            break_sound: None,
            vibration: true,
            bell: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    // Optional strings: an empty value clears them.
                    serde_json::Value::Null | serde_json::Value::String(_) if value.is_empty() => {
                        serde_json::Value::Null
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    /// Same as [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Same as [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Set a config value by key. The change is validated but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result would produce an unusable cycle.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated
            .cycle
            .validate()
            .map_err(|e| invalid(e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// Engine settings derived from this config.
    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            phases: self.cycle,
            focus_sound: self.feedback.focus_sound.clone(),
            break_sound: self.feedback.break_sound.clone(),
            vibration_enabled: self.feedback.vibration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.cycle.work_minutes, 25);
        assert!(parsed.feedback.vibration);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[cycle]\nwork_minutes = 50\n").unwrap();
        assert_eq!(parsed.cycle.work_minutes, 50);
        assert_eq!(parsed.cycle.break_minutes, 5);
        assert_eq!(parsed.feedback, FeedbackConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("cycle.work_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("feedback.vibration").as_deref(), Some("true"));
        assert_eq!(cfg.get("feedback.focus_sound").as_deref(), Some("null"));
        assert!(cfg.get("cycle").is_none());
        assert!(cfg.get("cycle.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("cycle.long_break_every", "3").unwrap();
        cfg.set("feedback.vibration", "false").unwrap();
        cfg.set("feedback.break_sound", "chime.ogg").unwrap();
        assert_eq!(cfg.cycle.long_break_every, 3);
        assert!(!cfg.feedback.vibration);
        assert_eq!(cfg.feedback.break_sound.as_deref(), Some("chime.ogg"));

        cfg.set("feedback.break_sound", "").unwrap();
        assert_eq!(cfg.feedback.break_sound, None);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("cycle.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("cycle", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.set("feedback.vibration", "sometimes");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert!(cfg.set("cycle.work_minutes", "-5").is_err());
    }

    #[test]
    fn set_rejects_unusable_cycle() {
        let mut cfg = Config::default();
        assert!(cfg.set("cycle.work_minutes", "0").is_err());
        assert_eq!(cfg.cycle.work_minutes, 25);
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.contains(&("cycle.work_minutes".to_string(), "25".to_string())));
        assert!(entries.contains(&("feedback.bell".to_string(), "true".to_string())));
        assert!(entries.iter().all(|(k, _)| k.contains('.')));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg;
        changed.set("cycle.work_minutes", "45").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().cycle.work_minutes, 45);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cycle = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn cycle_settings_follow_feedback_section() {
        let mut cfg = Config::default();
        cfg.set("feedback.focus_sound", "bell.wav").unwrap();
        let settings = cfg.cycle_settings();
        assert_eq!(settings.focus_sound.as_deref(), Some("bell.wav"));
        assert_eq!(settings.phases, cfg.cycle);
    }
}
