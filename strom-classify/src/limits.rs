//! Classifier table sizes.

/// Class-of-service table entries.
pub const COS_MAX_ENTRY: usize = 64;

/// Single-term rule table entries.
pub const PMR_MAX_ENTRY: usize = 64;

/// Multi-term rule set table entries.
pub const PMR_SET_MAX_ENTRY: usize = 64;

/// Terms in one rule set.
pub const PMR_TERM_MAX: usize = 8;

/// Widest term value, in bytes.
pub const PMR_TERM_BYTES_MAX: usize = 8;

/// Rules attached directly to one interface.
pub const PKTIO_MAX_PMR: usize = 8;

/// Entries in the VLAN priority table.
pub const L2_QOS_MAX: usize = 8;

/// Entries in the DSCP table.
pub const L3_QOS_MAX: usize = 64;

/// Links followed from one attached rule before giving up.
pub const PMR_CHAIN_DEPTH_MAX: usize = COS_MAX_ENTRY;

pub const COS_NAME_LEN: usize = 32;

// Chain traversal tracks visited classes in a u64.
const _: () = assert!(COS_MAX_ENTRY <= 64);
