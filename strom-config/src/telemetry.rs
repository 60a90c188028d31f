//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Fallback `EnvFilter` directives when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    #[validate(custom(function = validation::validate_log_filter))]
    pub log_filter: String,

    /// Prefix of every exported metric name.
    #[serde(default = "default_namespace")]
    #[validate(custom(function = validation::validate_object_name))]
    pub metrics_namespace: String,

    #[serde(default = "default_true")]
    pub thread_names: bool,
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_namespace() -> String {
    "strom".into()
}

fn default_true() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            metrics_namespace: default_namespace(),
            thread_names: default_true(),
        }
    }
}
