//! # strom-classify
//!
//! Ingress packet classifier. Rules (PMRs) match parsed header fields and
//! select a class of service (CoS); a class names the queue and pool a packet
//! is delivered to.
//!
//! ### Key Submodules:
//! - `term`: Match terms and field extraction
//! - `rule`: Single rules, rule sets and hit counters
//! - `cos`: Class-of-service descriptors
//! - `interface`: Per-interface defaults, attached rules and QoS maps
//! - `classifier`: Tables and class selection
//! - `deliver`: Full ingress decision through to the destination queue

pub mod classifier;
pub mod cos;
pub mod deliver;
pub mod error;
pub mod interface;
pub mod limits;
pub mod rule;
pub mod term;

pub use classifier::Classifier;
pub use cos::{CosId, CosInfo, CosParams, DropPolicy};
pub use deliver::{Delivery, DropReason};
pub use error::{ClassifyError, ClassifyResult};
pub use interface::PktioClassifier;
pub use rule::{PmrId, PmrRef, PmrSetId, RuleStats};
pub use term::{terms_capability, PmrMatch, PmrTerm};
