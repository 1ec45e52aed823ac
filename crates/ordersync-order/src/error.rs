//! Errors reported by order and reference services.

use ordersync_core::ReconcileError;

use crate::types::Operation;

/// Errors that can occur while talking to the order service.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The remote side answered with a non-success status.
    #[error("HTTP {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The response could not be decoded.
    #[error("decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// The order or reference entry does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },
}

impl OrderError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Status` error.
    #[must_use]
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            body: body.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            Self::Decode { .. } | Self::NotFound { .. } => false,
        }
    }

    /// Converts into a reconciliation failure for `operation`, keeping the
    /// message verbatim.
    #[must_use]
    pub fn into_reconcile(self, operation: Operation) -> ReconcileError {
        ReconcileError::remote(operation.as_str(), self.to_string())
    }
}
