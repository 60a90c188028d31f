//! # Strom Configuration System
//!
//! Layered configuration for the event core, classifier, packet I/O and
//! telemetry.
//!
//! ## Features
//! - **Layered sources**: defaults, YAML files, then environment variables
//! - **Validation**: ranges, names and alignments checked before use
//! - **Plain data**: no dependency on the crates being configured

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod classifier;
mod core;
mod error;
mod pktio;
mod telemetry;
mod validation;

pub use classifier::ClassifierConfig;
pub use self::core::{CoreConfig, PoolConfig, PoolKindConfig, QueueConfig, QueueDefaults, SyncConfig};
pub use error::ConfigError;
pub use pktio::PktioConfig;
pub use telemetry::TelemetryConfig;

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct StromConfig {
    /// Pools and queues of the event core.
    #[serde(default)]
    #[validate(nested)]
    pub core: CoreConfig,

    #[serde(default)]
    #[validate(nested)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    #[validate(nested)]
    pub pktio: PktioConfig,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl StromConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/strom.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<STROM_ENV>.yaml` - Environment-specific overrides.
    /// 4. `STROM_*` environment variables, `__` separating nesting levels.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(StromConfig::default()));

        if Path::new("config/strom.yaml").exists() {
            figment = figment.merge(Yaml::file("config/strom.yaml"));
        }

        let env = std::env::var("STROM_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment.merge(Env::prefixed("STROM_").ignore(&["env"]).split("__")))
    }

    /// Load configuration from a specific file, then the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::finish(
            Figment::from(Serialized::defaults(StromConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed("STROM_").ignore(&["env"]).split("__")),
        )
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        config.check_references()?;
        Ok(config)
    }

    /// Cross-section checks: unique names and pool references that resolve.
    fn check_references(&self) -> Result<(), ConfigError> {
        let mut pools: Vec<&str> = self.core.pools.iter().map(|p| p.name.as_str()).collect();
        pools.sort_unstable();
        if let Some(pair) = pools.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Inconsistent(format!(
                "pool `{}` defined twice",
                pair[0]
            )));
        }

        let mut queues: Vec<&str> = self.core.queues.iter().map(|q| q.name.as_str()).collect();
        queues.sort_unstable();
        if let Some(pair) = queues.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Inconsistent(format!(
                "queue `{}` defined twice",
                pair[0]
            )));
        }

        if let Some(queue) = self
            .core
            .queues
            .iter()
            .find(|q| q.lock_count > 0 && q.sync != SyncConfig::Ordered)
        {
            return Err(ConfigError::Inconsistent(format!(
                "queue `{}` has ordered locks but is not ordered",
                queue.name
            )));
        }

        if !pools.contains(&self.pktio.pool.as_str()) {
            return Err(ConfigError::Inconsistent(format!(
                "pktio pool `{}` is not defined",
                self.pktio.pool
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn full_config_validation() {
        let config = StromConfig::default();
        config.validate().expect("Default config should validate");
        config.check_references().expect("Default references resolve");
    }

    #[test]
    fn environment_override() {
        Jail::expect_with(|jail| {
            jail.set_env("STROM_CORE__QUEUE_DEFAULTS__CAPACITY", "8192");
            jail.set_env("STROM_TELEMETRY__LOG_FILTER", "strom_core=debug");
            let config = StromConfig::load().expect("config loads");
            assert_eq!(config.core.queue_defaults.capacity, 8192);
            assert_eq!(config.telemetry.log_filter, "strom_core=debug");
            Ok(())
        });
    }

    #[test]
    fn layers_base_and_environment_files() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/strom.yaml",
                r#"
core:
  pools:
    - name: packets
      kind: packet
      num: 512
  queues:
    - name: work
      sync: atomic
classifier:
  l3_precedence: true
"#,
            )?;
            jail.create_file("config/lab.yaml", "classifier:\n  cos_entries: 8\n")?;
            jail.set_env("STROM_ENV", "lab");

            let config = StromConfig::load().expect("config loads");
            assert_eq!(config.core.pools[0].num, 512);
            assert_eq!(config.core.queues[0].sync, SyncConfig::Atomic);
            assert!(config.classifier.l3_precedence);
            assert_eq!(config.classifier.cos_entries, 8);
            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_pktio_pool() {
        Jail::expect_with(|jail| {
            jail.create_file("strom.yaml", "pktio:\n  pool: missing\n")?;
            let err = StromConfig::load_from_path("strom.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Inconsistent(_)));
            Ok(())
        });
    }

    #[test]
    fn rejects_out_of_range_values() {
        Jail::expect_with(|jail| {
            jail.create_file("strom.yaml", "classifier:\n  cos_entries: 65\n")?;
            let err = StromConfig::load_from_path("strom.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = StromConfig::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
