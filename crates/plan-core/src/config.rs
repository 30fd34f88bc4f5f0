//! Planner configuration loaded from YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Fixed divisors of the funnel pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConstants {
    /// Weeks per month, not calendar-aware.
    pub weeks_per_month: u32,
    /// Business days per week.
    pub business_days_per_week: u32,
    /// Leads that one day of outreach covers.
    pub leads_per_outreach_day: u32,
}

impl Default for FunnelConstants {
    fn default() -> Self {
        Self {
            weeks_per_month: 4,
            business_days_per_week: 5,
            leads_per_outreach_day: 20,
        }
    }
}

/// Snapshot export settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Upscale factor handed to the renderer.
    pub scale: u32,
    /// Background colour as a CSS hex string.
    pub background: String,
    /// Seconds to wait for the renderer before giving up.
    pub timeout_secs: u64,
    /// Exported file names start with this prefix.
    pub file_prefix: String,
    /// Used in the file name when the company is empty.
    pub fallback_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: 2,
            background: "#ffffff".to_string(),
            timeout_secs: 30,
            file_prefix: "plano-prospeccao".to_string(),
            fallback_name: "export".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Key of the worksheet snapshot in the key-value store.
    pub storage_key: String,
    pub funnel: FunnelConstants,
    pub export: ExportSettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            storage_key: crate::STORAGE_KEY.to_string(),
            funnel: FunnelConstants::default(),
            export: ExportSettings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl PlannerConfig {
    /// Parse and validate a YAML document. Missing keys take defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: PlannerConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a YAML file, or return the defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                debug!(path = %p.display(), "loading planner config");
                let text = std::fs::read_to_string(p)?;
                Self::from_yaml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !crate::is_valid_storage_key(&self.storage_key) {
            return Err(ConfigError::Invalid(format!(
                "storage_key {:?} must be non-empty, not start with '.', and use only [A-Za-z0-9_.-]",
                self.storage_key
            )));
        }
        let f = &self.funnel;
        if f.weeks_per_month == 0 || f.business_days_per_week == 0 || f.leads_per_outreach_day == 0
        {
            return Err(ConfigError::Invalid("funnel divisors must be > 0".into()));
        }
        if self.export.scale == 0 {
            return Err(ConfigError::Invalid("export.scale must be > 0".into()));
        }
        if self.export.timeout_secs == 0 {
            return Err(ConfigError::Invalid("export.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}
