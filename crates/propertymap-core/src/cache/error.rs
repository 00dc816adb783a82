use thiserror::Error;

use crate::api::ApiError;

/// Failure of a full refresh.
///
/// Cloneable so a single failure can be handed to every caller waiting on the
/// same refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The first page failed, so nothing was fetched at all
    #[error("Upstream unavailable at offset {offset}: {message}")]
    UpstreamUnavailable {
        offset: usize,
        status: Option<u16>,
        message: String,
    },

    /// The refresh task panicked or was cancelled before finishing
    #[error("Refresh aborted: {0}")]
    RefreshAborted(String),
}

impl FetchError {
    pub(crate) fn upstream(offset: usize, err: &anyhow::Error) -> Self {
        FetchError::UpstreamUnavailable {
            offset,
            status: err.downcast_ref::<ApiError>().and_then(ApiError::status),
            message: format!("{:#}", err),
        }
    }

    /// Upstream HTTP status, when the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::UpstreamUnavailable { status, .. } => *status,
            FetchError::RefreshAborted(_) => None,
        }
    }
}
