use thiserror::Error;

use strom_classify::ClassifyError;
use strom_core::{CoreError, ErrorKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PktioError {
    #[error("interface `{name}` is {state}, expected {expected}")]
    State {
        name: String,
        state: &'static str,
        expected: &'static str,
    },

    #[error("interface headroom {requested} exceeds the {reserved} bytes reserved by the pool")]
    Headroom { requested: u32, reserved: u32 },

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PktioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PktioError::State { .. } => ErrorKind::Usage,
            PktioError::Headroom { .. } => ErrorKind::Configuration,
            PktioError::Classify(err) => err.kind(),
            PktioError::Core(err) => err.kind(),
        }
    }
}

pub type PktioResult<T> = Result<T, PktioError>;
