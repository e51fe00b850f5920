use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".orbit";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REVIEW_TIME: &str = "21:00";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub review_time: String,
    pub review_enabled: bool,
    pub daemon_label: String,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("orbit.db"),
            api_port: 7891,
            review_time: DEFAULT_REVIEW_TIME.to_string(),
            review_enabled: true,
            daemon_label: "com.orbit.daemon".to_string(),
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    pub fn parse_review_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.review_time)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "review_time" => {
                parse_hhmm(value)?;
                self.review_time = value.to_string();
            }
            "review_enabled" => {
                self.review_enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("review_enabled must be true/false"))?;
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: review_time|review.time, review_enabled|review.enabled, api_port|api.port"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "review_time" => Some(self.review_time.clone()),
            "review_enabled" => Some(self.review_enabled.to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "daemon_label" => Some(self.daemon_label.clone()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "review_time" | "review.time" => "review_time",
        "review_enabled" | "review.enabled" => "review_enabled",
        "api_port" | "api.port" => "api_port",
        "db_path" | "db.path" => "db_path",
        "daemon_label" | "daemon.label" => "daemon_label",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 21:00 (24-hour format)",))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_hhmm};

    #[test]
    fn set_and_get_accept_dotted_aliases() {
        let mut config = Config::default();

        config.set_value("review.time", "07:45").expect("set");
        assert_eq!(config.get_value("review_time").as_deref(), Some("07:45"));

        config.set_value("api.port", "9000").expect("set");
        assert_eq!(config.api_port, 9000);

        config.set_value("review_enabled", "false").expect("set");
        assert!(!config.review_enabled);
    }

    #[test]
    fn rejects_invalid_values_and_keys() {
        let mut config = Config::default();

        assert!(config.set_value("review_time", "25:00").is_err());
        assert!(config.set_value("api_port", "not-a-port").is_err());
        assert!(config.set_value("no_such_key", "1").is_err());
        assert!(config.get_value("no_such_key").is_none());
    }

    #[test]
    fn hhmm_parsing() {
        assert!(parse_hhmm("21:00").is_ok());
        assert!(parse_hhmm("9:05").is_ok());
        assert!(parse_hhmm("21h00").is_err());
        assert!(parse_hhmm("").is_err());
    }
}
