//! Error types for backup request building and submission
//!
//! Every variant is fatal to the invocation. Nothing here is retried:
//! the caller surfaces the message and exits.

use thiserror::Error;

/// Result alias for backup operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building, validating, or submitting a backup request
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced Velero object does not exist in the target namespace
    #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
    ReferenceNotFound {
        /// Resource kind (e.g. "VolumeSnapshotLocation")
        kind: String,
        /// Name that failed to resolve
        name: String,
        /// Namespace the lookup ran in
        namespace: String,
    },

    /// The create call for the Backup was rejected or never reached the server
    #[error("failed to submit backup \"{name}\": {source}")]
    Submission {
        /// Name of the Backup being created
        name: String,
        /// The remote error, message preserved as returned
        #[source]
        source: Box<Error>,
    },

    /// Kubernetes API error
    #[error("{source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Malformed label query
    #[error("invalid label selector {input:?}: {message}")]
    InvalidSelector {
        /// The raw selector text
        input: String,
        /// What is wrong with it
        message: String,
    },

    /// Malformed duration string
    #[error("invalid duration {input:?}: {message}")]
    InvalidDuration {
        /// The raw duration text
        input: String,
        /// What is wrong with it
        message: String,
    },
}

impl Error {
    /// Create a reference-not-found error
    pub fn reference_not_found(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::ReferenceNotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Wrap a remote failure as a submission error for the named Backup
    pub fn submission(name: impl Into<String>, source: Error) -> Self {
        Self::Submission {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a specific resource kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    pub(crate) fn invalid_selector(input: &str, msg: impl Into<String>) -> Self {
        Self::InvalidSelector {
            input: input.to_string(),
            message: msg.into(),
        }
    }

    pub(crate) fn invalid_duration(input: &str, msg: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.to_string(),
            message: msg.into(),
        }
    }

    /// Whether this error reports a missing referenced object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ReferenceNotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
