use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{KakeiboError, Result};

pub const ENDPOINT_ENV: &str = "KAKEIBO_ENDPOINT_URL";
pub const PASSPHRASE_ENV: &str = "KAKEIBO_PASSPHRASE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default = "default_payers")]
    pub payers: [String; 2],
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_payers() -> [String; 2] {
    ["A".to_string(), "B".to_string()]
}

fn default_categories() -> Vec<String> {
    ["food", "daily goods", "housing/utilities", "social", "other"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            endpoint_url: None,
            passphrase: None,
            payers: default_payers(),
            categories: default_categories(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Endpoint from the environment, then the settings file. Blank is unset.
    pub fn endpoint(&self) -> Option<String> {
        non_blank(std::env::var(ENDPOINT_ENV).ok()).or_else(|| non_blank(self.endpoint_url.clone()))
    }

    /// Passphrase from the environment, then the settings file. Blank is unset.
    pub fn configured_passphrase(&self) -> Option<String> {
        non_blank(std::env::var(PASSPHRASE_ENV).ok()).or_else(|| non_blank(self.passphrase.clone()))
    }

    pub fn default_category(&self) -> &str {
        self.categories.first().map(String::as_str).unwrap_or("other")
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("kakeibo.db")
    }

    /// Apply a `key=value` pair from `kakeibo config --set`.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| KakeiboError::Settings(format!("expected key=value, got '{assignment}'")))?;
        let value = value.trim();
        match key.trim() {
            "data_dir" => self.data_dir = shellexpand_path(value),
            "endpoint_url" => self.endpoint_url = non_blank(Some(value.to_string())),
            "passphrase" => self.passphrase = non_blank(Some(value.to_string())),
            "payers" => {
                let names: Vec<&str> = value.split(',').map(str::trim).collect();
                match names.as_slice() {
                    [a, b] if !a.is_empty() && !b.is_empty() && a != b => {
                        self.payers = [a.to_string(), b.to_string()];
                    }
                    _ => {
                        return Err(KakeiboError::Settings(
                            "payers must be two distinct names, e.g. payers=Alex,Sam".to_string(),
                        ))
                    }
                }
            }
            "categories" => {
                let cats: Vec<String> = value
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if cats.is_empty() {
                    return Err(KakeiboError::Settings("categories cannot be empty".to_string()));
                }
                self.categories = cats;
            }
            "timeout_secs" => {
                self.timeout_secs = value
                    .parse()
                    .map_err(|_| KakeiboError::Settings(format!("timeout_secs must be a number, got '{value}'")))?;
            }
            other => return Err(KakeiboError::Settings(format!("unknown setting '{other}'"))),
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("kakeibo")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("kakeibo")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| KakeiboError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            endpoint_url: Some("https://example.invalid/exec".to_string()),
            payers: ["Ryo".to_string(), "Mari".to_string()],
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.payers, ["Ryo".to_string(), "Mari".to_string()]);
        assert_eq!(loaded.endpoint_url.as_deref(), Some("https://example.invalid/exec"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.payers, default_payers());
        assert_eq!(s.categories.len(), 5);
        assert_eq!(s.timeout_secs, 15);
        assert!(s.endpoint_url.is_none());
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.default_category(), "food");
        assert!(!s.data_dir.is_empty());
        assert!(s.db_path().ends_with("kakeibo.db"));
    }

    #[test]
    fn test_set_payers() {
        let mut s = Settings::default();
        s.set("payers=Ryo, Mari").unwrap();
        assert_eq!(s.payers, ["Ryo".to_string(), "Mari".to_string()]);
        assert!(s.set("payers=Solo").is_err());
        assert!(s.set("payers=Same,Same").is_err());
    }

    #[test]
    fn test_set_blank_endpoint_clears_it() {
        let mut s = Settings::default();
        s.set("endpoint_url=https://example.invalid/exec").unwrap();
        assert!(s.endpoint_url.is_some());
        s.set("endpoint_url=").unwrap();
        assert!(s.endpoint_url.is_none());
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let mut s = Settings::default();
        assert!(s.set("colour=blue").is_err());
        assert!(s.set("no-equals-sign").is_err());
    }
}
