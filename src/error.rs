//! Error types for the application operator
//!
//! Errors fall into four categories that drive how the controller reacts:
//! transient storage failures are requeued quickly, ownership conflicts are
//! surfaced on status and retried slowly, and configuration errors abort
//! startup. "Not found" is never an error here; the storage port reports it
//! as `Ok(None)`.

use thiserror::Error;

/// Main error type for application operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A target Application with the derived name exists but belongs to someone else
    #[error(
        "Argo CD Application {namespace}/{target} already exists and is not owned by {owner}"
    )]
    OwnershipConflict {
        /// Name of the existing target Application
        target: String,
        /// Namespace of the existing target Application
        namespace: String,
        /// `namespace/name` of the owner that tried to claim it
        owner: String,
    },

    /// Invalid or missing process configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create an ownership conflict error
    pub fn ownership_conflict(
        target: impl Into<String>,
        namespace: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::OwnershipConflict {
            target: target.into(),
            namespace: namespace.into(),
            owner: owner.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error is retryable
    ///
    /// Kubernetes errors are retryable unless the API server rejected the
    /// request outright (4xx). Optimistic-concurrency conflicts (409) and
    /// throttling (429) are the exceptions: a fresh read fixes them.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || ae.code == 409 || ae.code == 429
                }
                _ => true,
            },
            Error::OwnershipConflict { .. } => false,
            Error::Config(_) => false,
            Error::Serialization { .. } => false,
        }
    }

    /// True if the API server answered 404 Not Found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Kube {
                source: kube::Error::Api(ae)
            } if ae.code == 404
        )
    }

    /// True for the ownership conflict variant
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::OwnershipConflict { .. })
    }
}
