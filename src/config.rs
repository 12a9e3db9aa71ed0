use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_ENTRIES_PER_SITE: usize = 8;

pub const MAX_ENTRIES_ENV: &str = "GUARDCACHE_MAX_ENTRIES_PER_SITE";
pub const REPORT_FAILURES_ENV: &str = "GUARDCACHE_REPORT_GUARD_FAILURES";

/// Process-wide cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bound on specializations per call site; FIFO eviction keeps it.
    pub max_entries_per_site: usize,
    /// Whether a full miss is handed to the failure sink.
    pub report_guard_failures: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_site: DEFAULT_MAX_ENTRIES_PER_SITE,
            report_guard_failures: true,
        }
    }
}

impl CacheConfig {
    pub fn with_max_entries(max_entries_per_site: usize) -> Self {
        Self {
            max_entries_per_site,
            ..Self::default()
        }
    }

    /// Reads overrides from `GUARDCACHE_MAX_ENTRIES_PER_SITE` and
    /// `GUARDCACHE_REPORT_GUARD_FAILURES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`CacheConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_ENTRIES_ENV) {
            config.max_entries_per_site = raw.trim().parse().map_err(|err: ParseIntError| {
                ConfigError::InvalidValue {
                    key: MAX_ENTRIES_ENV,
                    value: raw.clone(),
                    reason: err.to_string(),
                }
            })?;
        }
        if let Some(raw) = lookup(REPORT_FAILURES_ENV) {
            config.report_guard_failures =
                parse_flag(&raw).ok_or_else(|| ConfigError::InvalidValue {
                    key: REPORT_FAILURES_ENV,
                    value: raw.clone(),
                    reason: "expected one of 1, 0, true, false, on, off".into(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries_per_site == 0 {
            return Err(ConfigError::ZeroBound);
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
