//! Classifier table sizing and per-interface defaults.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// CoS table entries.
    #[serde(default = "default_entries")]
    #[validate(range(min = 1, max = 64))]
    pub cos_entries: usize,

    /// Single-term rule entries.
    #[serde(default = "default_entries")]
    #[validate(range(min = 1, max = 64))]
    pub pmr_entries: usize,

    /// Multi-term rule set entries.
    #[serde(default = "default_entries")]
    #[validate(range(min = 1, max = 64))]
    pub pmr_set_entries: usize,

    /// Refuse to start an interface that has neither rules nor a default CoS.
    #[serde(default = "default_true")]
    pub require_default_cos: bool,

    /// Consult the DSCP table before the PCP table.
    #[serde(default)]
    pub l3_precedence: bool,
}

fn default_entries() -> usize {
    64
}

fn default_true() -> bool {
    true
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cos_entries: default_entries(),
            pmr_entries: default_entries(),
            pmr_set_entries: default_entries(),
            require_default_cos: default_true(),
            l3_precedence: false,
        }
    }
}
