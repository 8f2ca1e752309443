use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Jitter fraction in [0, 1].
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
            jitter: self.jitter.clamp(0.0, 1.0),
        }
    }
}

/// Global configuration loaded from `~/.config/cux/config.toml`.
/// Everything here is a default; CLI flags win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuxConfig {
    /// Checkpoint every N pages.
    pub checkpoint_pages: u32,
    /// Checkpoint every M newly exported records, whichever comes first.
    pub checkpoint_records: u64,
    /// Flat delay between successful page fetches, in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl Default for CuxConfig {
    fn default() -> Self {
        Self {
            checkpoint_pages: 10,
            checkpoint_records: 500,
            cooldown_ms: default_cooldown_ms(),
            retry: None,
        }
    }
}

fn default_cooldown_ms() -> u64 {
    200
}

impl CuxConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cux")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CuxConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CuxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CuxConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CuxConfig::default();
        assert_eq!(cfg.checkpoint_pages, 10);
        assert_eq!(cfg.checkpoint_records, 500);
        assert_eq!(cfg.cooldown_ms, 200);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CuxConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CuxConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.checkpoint_pages, cfg.checkpoint_pages);
        assert_eq!(parsed.checkpoint_records, cfg.checkpoint_records);
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            checkpoint_pages = 5
            checkpoint_records = 100

            [retry]
            max_retries = 3
            base_delay_secs = 0.25
            max_delay_secs = 15
            jitter = 0.1
        "#;
        let cfg: CuxConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.checkpoint_pages, 5);
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_retries, 3);
        assert!((retry.base_delay_secs - 0.25).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 15);

        let policy = cfg.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_delay, Duration::from_secs(15));
    }

    #[test]
    fn retry_policy_defaults_match_builtin() {
        let cfg = CuxConfig::default();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_retries, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }
}
