//! Remote store errors.

use reqwest::StatusCode;
use thiserror::Error;

use super::orders::OrderBuildError;
use crate::transport::TransportError;

/// Errors from the remote document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store answered with a non-2xx status.
    #[error("store rejected {path} ({status})")]
    Rejected { path: String, status: StatusCode },

    /// The body did not decode into the expected document.
    #[error("malformed document at {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// A key would escape its collection or is empty.
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),

    /// The session belongs to a different user than the one addressed.
    #[error("session user does not own the requested data")]
    ScopeMismatch,

    /// The order was refused before anything was written.
    #[error(transparent)]
    Order(#[from] OrderBuildError),

    #[error("invalid store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl StoreError {
    /// Whether the store refused the credentials (401/403).
    ///
    /// Right after sign-in the token may not have propagated yet.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Rejected { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}
