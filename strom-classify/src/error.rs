//! Classifier errors.

use thiserror::Error;

use strom_core::{CoreError, ErrorKind};

use crate::cos::CosId;
use crate::rule::PmrRef;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("{table} table full ({max} entries)")]
    TableFull { table: &'static str, max: usize },

    #[error("class of service {0} not found")]
    CosNotFound(CosId),

    #[error("{0} not found")]
    RuleNotFound(PmrRef),

    #[error("term value of {size} bytes exceeds the {max} byte maximum")]
    TermTooWide { size: u32, max: usize },

    #[error("rule set of {count} terms exceeds the {max} term maximum")]
    TooManyTerms { count: usize, max: usize },

    #[error("interface already has {max} rules attached")]
    InterfaceRulesFull { max: usize },

    #[error("rule chain from cos {start} revisits cos {cos}")]
    ChainCycle { start: CosId, cos: CosId },

    #[error("rule chain from cos {start} is longer than {max} links")]
    ChainTooDeep { start: CosId, max: usize },

    #[error("interface has neither rules nor a default class of service")]
    NoDefaultCos,

    #[error("invalid classifier parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClassifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifyError::TableFull { .. } | ClassifyError::InterfaceRulesFull { .. } => {
                ErrorKind::ResourceExhausted
            }
            ClassifyError::CosNotFound(_) | ClassifyError::RuleNotFound(_) => {
                ErrorKind::InvalidHandle
            }
            ClassifyError::TermTooWide { .. }
            | ClassifyError::TooManyTerms { .. }
            | ClassifyError::ChainCycle { .. }
            | ClassifyError::ChainTooDeep { .. }
            | ClassifyError::NoDefaultCos
            | ClassifyError::InvalidParams(_) => ErrorKind::Configuration,
            ClassifyError::Core(err) => err.kind(),
        }
    }
}

pub type ClassifyResult<T> = Result<T, ClassifyError>;
