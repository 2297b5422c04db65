//! Engine configuration

use rgs_rng::PoolConfig;
use serde::{Deserialize, Serialize};

use crate::error::FeatureResult;

/// Environment variable that switches developer mode on (`1`, `true`, `yes`)
/// or off (`0`, `false`, `no`)
pub const DEVELOPER_MODE_ENV: &str = "RGS_DEVELOPER_MODE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Honor `Force*` operator overrides in round parameters
    pub developer_mode: bool,
    pub pool: PoolConfig,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl EngineConfig {
    pub fn from_yaml(source: &str) -> FeatureResult<Self> {
        Ok(serde_yml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> FeatureResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(DEVELOPER_MODE_ENV) {
            match parse_flag(&raw) {
                Some(flag) => self.developer_mode = flag,
                None => log::warn!("Ignoring {}={:?}", DEVELOPER_MODE_ENV, raw),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_production() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert!(!config.developer_mode);
        assert_eq!(config.pool.initial_size, PoolConfig::default().initial_size);
    }

    #[test]
    fn test_yaml_and_json() {
        let yaml = "developer_mode: true\npool:\n  initial_size: 2\n  exercise_interval_ms: 0\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert!(config.developer_mode);
        assert_eq!(config.pool.initial_size, 2);
        assert_eq!(config.pool.exercise_interval_ms, 0);

        let config = EngineConfig::from_json(r#"{"pool": {"exercise_draws": 3}}"#).unwrap();
        assert_eq!(config.pool.exercise_draws, 3);
        assert_eq!(config.pool.initial_size, PoolConfig::default().initial_size);
    }

    #[test]
    fn test_env_override() {
        let on = EngineConfig::default().with_overrides(|k| {
            (k == DEVELOPER_MODE_ENV).then(|| "TRUE".to_string())
        });
        assert!(on.developer_mode);

        let garbage = on.clone().with_overrides(|_| Some("maybe".to_string()));
        assert!(garbage.developer_mode);

        let off = on.with_overrides(|_| Some("0".to_string()));
        assert!(!off.developer_mode);
    }
}
