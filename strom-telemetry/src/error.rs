use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter `{directives}`: {reason}")]
    Filter { directives: String, reason: String },

    #[error("a global log subscriber is already installed")]
    AlreadyInstalled,

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("metrics output is not UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
