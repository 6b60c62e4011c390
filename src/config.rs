use anyhow::{bail, Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings read from `config.yml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// Hours east of UTC used for every reading of "now".
    pub utc_offset_hours: i32,
    pub tick_interval_ms: u64,
    pub preparation_delay_ms: u64,
    pub history_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            log_level: "info".into(),
            utc_offset_hours: 9,
            tick_interval_ms: 1000,
            preparation_delay_ms: 3000,
            history_ttl_days: 7,
        }
    }
}

impl Config {
    pub fn history_ttl(&self) -> Duration {
        Duration::days(self.history_ttl_days)
    }

    pub fn preparation_delay(&self) -> Duration {
        Duration::milliseconds(self.preparation_delay_ms as i64)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if !(-23..=23).contains(&self.utc_offset_hours) {
            bail!("utc_offset_hours must be within -23..=23, got {}", self.utc_offset_hours);
        }
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be positive");
        }
        if self.history_ttl_days < 0 {
            bail!("history_ttl_days cannot be negative");
        }
        Ok(())
    }
}

/// Loads `explicit` or the platform config file; a missing file means defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    let config: Config =
        serde_yaml::from_str(&data).with_context(|| format!("parsing config {:?}", path))?;
    config.validate()?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "snailtrack").map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(Some(&dir.path().join("absent.yml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.utc_offset_hours, 9);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "tick_interval_ms: 500\ndata_dir: /tmp/snails\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/snails")));
        assert_eq!(config.preparation_delay_ms, 3000);
    }

    #[test]
    fn malformed_or_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "tick_interval_ms: [oops").unwrap();
        assert!(load(Some(&path)).is_err());
        fs::write(&path, "utc_offset_hours: 30\n").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("utc_offset_hours"));
    }
}
