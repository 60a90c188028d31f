//! Per-interface classification state: attached rules, QoS maps and the
//! fallback classes. Mutated through [`crate::Classifier`], which checks
//! every class and rule it is handed.

use parking_lot::RwLock;

use strom_config::ClassifierConfig;

use crate::cos::CosId;
use crate::limits::{L2_QOS_MAX, L3_QOS_MAX};
use crate::rule::PmrRef;

#[derive(Clone, Debug)]
pub(crate) struct InterfaceRules {
    pub(crate) default_cos: Option<CosId>,
    pub(crate) error_cos: Option<CosId>,
    /// Rules tested in attach order, each with the class it selects.
    pub(crate) rules: Vec<(PmrRef, CosId)>,
    /// VLAN priority code point to class.
    pub(crate) l2: [Option<CosId>; L2_QOS_MAX],
    /// DSCP to class.
    pub(crate) l3: [Option<CosId>; L3_QOS_MAX],
    pub(crate) l3_precedence: bool,
    pub(crate) skip: u32,
    pub(crate) headroom: u32,
}

impl Default for InterfaceRules {
    fn default() -> Self {
        Self {
            default_cos: None,
            error_cos: None,
            rules: Vec::new(),
            l2: [None; L2_QOS_MAX],
            l3: [None; L3_QOS_MAX],
            l3_precedence: false,
            skip: 0,
            headroom: 0,
        }
    }
}

/// Classification settings of one packet I/O interface.
#[derive(Debug, Default)]
pub struct PktioClassifier {
    pub(crate) state: RwLock<InterfaceRules>,
}

impl PktioClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings seeded from the classifier configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            state: RwLock::new(InterfaceRules {
                l3_precedence: config.l3_precedence,
                ..InterfaceRules::default()
            }),
        }
    }

    pub fn default_cos(&self) -> Option<CosId> {
        self.state.read().default_cos
    }

    pub fn error_cos(&self) -> Option<CosId> {
        self.state.read().error_cos
    }

    /// Bytes stripped from the front of every delivered packet.
    pub fn skip(&self) -> u32 {
        self.state.read().skip
    }

    pub fn headroom(&self) -> u32 {
        self.state.read().headroom
    }

    pub fn l3_precedence(&self) -> bool {
        self.state.read().l3_precedence
    }

    /// Attached rules in evaluation order.
    pub fn rules(&self) -> Vec<(PmrRef, CosId)> {
        self.state.read().rules.clone()
    }
}
