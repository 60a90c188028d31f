//! ## strom-classify::rule
//! **Packet matching rules**
//!
//! A rule is the logical AND of its terms. Single-term rules and multi-term
//! rule sets live in separate tables but share this representation; a
//! [`PmrRef`] names an entry in either.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use strom_protocols::ParsedPacket;

use crate::term::{PmrTerm, TermValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PmrId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PmrSetId(pub u32);

/// Either kind of rule, as attached to interfaces and classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PmrRef {
    Single(PmrId),
    Set(PmrSetId),
}

impl From<PmrId> for PmrRef {
    fn from(id: PmrId) -> Self {
        PmrRef::Single(id)
    }
}

impl From<PmrSetId> for PmrRef {
    fn from(id: PmrSetId) -> Self {
        PmrRef::Set(id)
    }
}

impl fmt::Display for PmrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmrRef::Single(id) => write!(f, "pmr {}", id.0),
            PmrRef::Set(id) => write!(f, "pmr set {}", id.0),
        }
    }
}

/// Hit count of one live rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleStats {
    pub rule: PmrRef,
    /// Distinguishes rules that reused the same table slot.
    pub generation: u64,
    pub terms: usize,
    pub hits: u64,
}

#[derive(Debug)]
pub(crate) struct Rule {
    terms: Vec<TermValue>,
    generation: u64,
    hits: AtomicU64,
}

impl Rule {
    pub(crate) fn new(terms: Vec<TermValue>, generation: u64) -> Self {
        Self {
            terms,
            generation,
            hits: AtomicU64::new(0),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Tests every term; a full match bumps the hit counter once.
    pub(crate) fn verify(&self, pkt: &ParsedPacket<'_>) -> bool {
        if self.matches(pkt) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Like [`Rule::verify`] without counting a hit.
    pub(crate) fn matches(&self, pkt: &ParsedPacket<'_>) -> bool {
        self.terms.iter().all(|term| term.matches(pkt))
    }

    #[inline]
    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub(crate) fn terms(&self) -> impl Iterator<Item = PmrTerm> + '_ {
        self.terms.iter().map(TermValue::term)
    }
}
