//! Dashboard configuration: JSON file, then environment, then CLI flags.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "METRO_BASE_URL";
pub const ENV_SYNTHETIC_FALLBACK: &str = "METRO_SYNTHETIC_FALLBACK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Scheme and authority of the stats backend, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub housing_endpoint: String,
    pub labour_endpoint: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Show generated baseline data when the backend cannot be reached.
    pub use_synthetic_fallback: bool,
    /// Census areas compared by the monthly views.
    pub cities: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            housing_endpoint: "/api/housingStats".into(),
            labour_endpoint: "/api/labourMarket".into(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            use_synthetic_fallback: false,
            cities: crate::lookup::DEFAULT_CITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl DashboardConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|k| std::env::var(k).ok());
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_SYNTHETIC_FALLBACK) {
            match parse_flag(&raw) {
                Some(flag) => self.use_synthetic_fallback = flag,
                None => log::warn!("ignoring {}={:?}: expected true/false", ENV_SYNTHETIC_FALLBACK, raw),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("base_url must start with http:// or https://, got {:?}", self.base_url);
        }
        for (name, ep) in [
            ("housing_endpoint", &self.housing_endpoint),
            ("labour_endpoint", &self.labour_endpoint),
        ] {
            if !ep.starts_with('/') {
                bail!("{} must start with '/', got {:?}", name, ep);
            }
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_and_bad_flags_are_ignored() {
        let mut cfg = DashboardConfig::default();
        cfg.apply_overrides(|k| match k {
            ENV_BASE_URL => Some("http://stats.internal:9000".into()),
            ENV_SYNTHETIC_FALLBACK => Some("yes".into()),
            _ => None,
        });
        assert_eq!(cfg.base_url, "http://stats.internal:9000");
        assert!(cfg.use_synthetic_fallback);

        cfg.apply_overrides(|k| (k == ENV_SYNTHETIC_FALLBACK).then(|| "maybe".to_string()));
        assert!(cfg.use_synthetic_fallback);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = DashboardConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.base_url = "localhost:8080".into();
        assert!(cfg.validate().is_err());
        cfg = DashboardConfig {
            labour_endpoint: "api/labourMarket".into(),
            ..DashboardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
