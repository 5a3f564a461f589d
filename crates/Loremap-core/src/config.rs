//! Environment-driven configuration for the sync engine.

use anyhow::{Context, Result};
use lore_canvas::EditorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const MIN_AUTO_SAVE_INTERVAL_MS: u64 = 1_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base URL of the remote store, e.g. `http://localhost:8080/api`.
    pub api_base_url: String,
    /// sqlx connection string of the local cache.
    pub cache_url: String,
    pub auto_save_enabled: bool,
    pub auto_save_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            cache_url: "sqlite:loremap-cache.db".to_string(),
            auto_save_enabled: true,
            auto_save_interval_ms: 30_000,
            request_timeout_ms: 10_000,
            history_limit: EditorConfig::default().history_limit,
        }
    }
}

impl SyncConfig {
    /// Reads `LOREMAP_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("LOREMAP_API_URL") {
            Url::parse(&url).with_context(|| format!("LOREMAP_API_URL is not a valid URL: {url}"))?;
            config.api_base_url = url;
        }
        if let Some(url) = lookup("LOREMAP_CACHE_URL") {
            config.cache_url = url;
        }
        if let Some(flag) = lookup("LOREMAP_AUTO_SAVE") {
            config.auto_save_enabled = parse_flag(&flag)
                .with_context(|| format!("LOREMAP_AUTO_SAVE must be a boolean, got {flag:?}"))?;
        }
        if let Some(ms) = lookup("LOREMAP_AUTO_SAVE_INTERVAL_MS") {
            config.auto_save_interval_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("LOREMAP_AUTO_SAVE_INTERVAL_MS is not a number: {ms:?}"))?;
        }
        if let Some(ms) = lookup("LOREMAP_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("LOREMAP_REQUEST_TIMEOUT_MS is not a number: {ms:?}"))?;
        }
        if let Some(limit) = lookup("LOREMAP_HISTORY_LIMIT") {
            config.history_limit = limit
                .trim()
                .parse()
                .with_context(|| format!("LOREMAP_HISTORY_LIMIT is not a number: {limit:?}"))?;
        }

        Ok(config)
    }

    pub fn auto_save_interval(&self) -> Duration {
        clamp_interval(Duration::from_millis(self.auto_save_interval_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            history_limit: self.history_limit,
            ..EditorConfig::default()
        }
    }
}

/// Auto-save never fires more often than once a second.
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(MIN_AUTO_SAVE_INTERVAL_MS))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.auto_save_interval(), Duration::from_secs(30));
        assert_eq!(config.editor_config().history_limit, 50);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("LOREMAP_API_URL", "https://lore.example/api"),
            ("LOREMAP_AUTO_SAVE", "off"),
            ("LOREMAP_AUTO_SAVE_INTERVAL_MS", "250"),
            ("LOREMAP_HISTORY_LIMIT", "10"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://lore.example/api");
        assert!(!config.auto_save_enabled);
        // Floored at one second
        assert_eq!(config.auto_save_interval(), Duration::from_secs(1));
        assert_eq!(config.editor_config().history_limit, 10);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SyncConfig::from_lookup(lookup(&[("LOREMAP_API_URL", "not a url")])).is_err());
        assert!(SyncConfig::from_lookup(lookup(&[("LOREMAP_AUTO_SAVE", "maybe")])).is_err());
        assert!(
            SyncConfig::from_lookup(lookup(&[("LOREMAP_REQUEST_TIMEOUT_MS", "soon")])).is_err()
        );
    }
}
