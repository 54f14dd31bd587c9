//! Failure taxonomy for upstream sources and the realtime store.
//!
//! None of these cross the acquisition or merge boundary: the orchestrator
//! logs them and moves to the next tier. Only the HTTP proxy routes turn a
//! [`SourceError`] into an error envelope.

use std::time::Duration;

use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or a non-2xx response.
    #[error("{source_id} unavailable: {reason}")]
    Unavailable { source_id: &'static str, reason: String },

    /// 2xx response without usable data.
    #[error("{0} returned an empty payload")]
    EmptyPayload(&'static str),

    /// Response did not match the expected shape.
    #[error("{source_id} returned a malformed payload: {reason}")]
    Malformed { source_id: &'static str, reason: String },

    /// Credentials or base URL not configured.
    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("{source_id} timed out after {after:?}")]
    Timeout { source_id: &'static str, after: Duration },
}

impl SourceError {
    pub fn unavailable(source_id: &'static str, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            source_id,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_id: &'static str, reason: impl ToString) -> Self {
        SourceError::Malformed {
            source_id,
            reason: reason.to_string(),
        }
    }

    /// Short, stable class name for log fields.
    pub fn class(&self) -> &'static str {
        match self {
            SourceError::Unavailable { .. } => "source-unavailable",
            SourceError::EmptyPayload(_) => "empty-payload",
            SourceError::Malformed { .. } => "malformed-payload",
            SourceError::Unconfigured(_) => "unconfigured",
            SourceError::Timeout { .. } => "timeout",
        }
    }

    /// Classify a transport error from `reqwest`.
    ///
    /// The request URL is stripped first: upstream credentials travel in the
    /// query string and must not reach logs or response bodies.
    pub fn from_reqwest(source_id: &'static str, err: reqwest::Error) -> Self {
        // ---
        let err = err.without_url();
        if err.is_decode() {
            SourceError::malformed(source_id, err)
        } else {
            SourceError::unavailable(source_id, err)
        }
    }
}
