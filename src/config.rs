use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration for valet.
///
/// Credentials are supplied pre-authenticated: the hosting agent (or its
/// operator) runs whatever OAuth or key-provisioning flow the vendor needs
/// and hands the resulting token over here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct Config {
    pub google: GoogleConfig,
    pub spotify: SpotifyConfig,
    pub weather: WeatherConfig,
}

/// Shared OAuth bearer token for the Gmail and Calendar APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct GoogleConfig {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpotifyConfig {
    pub access_token: String,
    /// How many search results to rank per query.
    pub search_limit: u32,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            search_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct WeatherConfig {
    pub api_key: String,
}

// ====== Config loading/saving ======

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `VALET_CONFIG` env var — full JSON config
/// 2. Individual env vars (merged on top of the file/defaults)
/// 3. File fallback (`~/.valet/config.json`)
pub fn load_config_from_env() -> Config {
    if let Ok(json) = std::env::var("VALET_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse VALET_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(None);

    if let Ok(v) = std::env::var("GOOGLE_ACCESS_TOKEN") {
        cfg.google.access_token = v;
    }
    if let Ok(v) = std::env::var("SPOTIFY_ACCESS_TOKEN") {
        cfg.spotify.access_token = v;
    }
    if let Ok(v) = std::env::var("WEATHER_API_KEY") {
        cfg.weather.api_key = v;
    }

    cfg
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".valet")
        .join("config.json")
}

/// Load configuration from file or fall back to defaults.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Save configuration to file.
pub fn save_config(
    config: &Config,
    config_path: Option<&Path>,
) -> std::result::Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert!(cfg.google.access_token.is_empty());
        assert!(cfg.spotify.access_token.is_empty());
        assert!(cfg.weather.api_key.is_empty());
        assert_eq!(cfg.spotify.search_limit, 20);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut cfg = Config::default();
        cfg.spotify.access_token = "BQabc".to_string();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.spotify.access_token, cfg.spotify.access_token);
        assert_eq!(parsed.spotify.search_limit, cfg.spotify.search_limit);
    }

    #[test]
    fn test_config_camelcase_compat() {
        let json = r#"{
            "google": { "accessToken": "ya29.test" },
            "spotify": { "accessToken": "BQtest", "searchLimit": 5 },
            "weather": { "apiKey": "wx-123" }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.google.access_token, "ya29.test");
        assert_eq!(cfg.spotify.access_token, "BQtest");
        assert_eq!(cfg.spotify.search_limit, 5);
        assert_eq!(cfg.weather.api_key, "wx-123");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "weather": { "apiKey": "wx-123" } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.weather.api_key, "wx-123");
        assert_eq!(cfg.spotify.search_limit, 20);
        assert!(cfg.google.access_token.is_empty());
    }

    #[test]
    fn test_save_and_load_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let mut cfg = Config::default();
        cfg.weather.api_key = "wx-save".to_string();
        save_config(&cfg, Some(&path)).unwrap();

        assert!(path.exists());
        let loaded = load_config(Some(&path));
        assert_eq!(loaded.weather.api_key, "wx-save");
    }

    #[test]
    fn test_load_config_missing_file() {
        let path = Path::new("/tmp/nonexistent_valet_test.json");
        let cfg = load_config(Some(path));
        assert!(cfg.google.access_token.is_empty());
    }

    #[test]
    fn test_load_config_from_env_full_json() {
        let json = r#"{ "spotify": { "accessToken": "BQ-env" } }"#;
        std::env::set_var("VALET_CONFIG", json);
        let cfg = load_config_from_env();
        assert_eq!(cfg.spotify.access_token, "BQ-env");
        std::env::remove_var("VALET_CONFIG");
    }
}
