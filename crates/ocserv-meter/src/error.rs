//! Meter error types.

use ocserv_core::{ERROR_MALFORMED, ERROR_NOT_FOUND, ERROR_STATE, ERROR_STORE};
use ocserv_store::StoreError;

/// Meter error type.
#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    /// A disconnect line did not carry a usable username/rx/tx triple.
    #[error("malformed disconnect line: {0}")]
    Malformed(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// The VPN server reported its own shutdown.
    #[error("ocserv reported server shutdown")]
    UpstreamShutdown,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl MeterError {
    /// Stable label for the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => ERROR_MALFORMED,
            Self::UnknownUser(_) => ERROR_NOT_FOUND,
            Self::Store(_) => ERROR_STORE,
            Self::UpstreamShutdown | Self::Io(_) => ERROR_STATE,
        }
    }
}
