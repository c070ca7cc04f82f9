//! # Reconciler Errors
//!
//! Error taxonomy shared by the reconciler and the collaborators it drives.
//!
//! Classification matters more than the message: the error policy picks a
//! requeue strategy from [`Error::kind`], and the annotation synchronizer and
//! certificate gateway treat [`ErrorKind::NotFound`] as success where
//! cleanup is concerned.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A referenced object does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    /// Certificate material that can never import until an operator fixes it
    #[error("secret {secret:?} holds malformed certificate material: {reason}")]
    MalformedInput { secret: String, reason: String },

    /// Optimistic concurrency failure; the object changed since it was read
    #[error("{kind} {name:?} was modified concurrently")]
    Conflict { kind: &'static str, name: String },

    /// Any other Kubernetes API failure
    #[error("{context}: {source}")]
    Kube {
        context: String,
        #[source]
        source: kube::Error,
    },

    /// Failure talking to the remote certificate store
    #[error("certificate store {operation} failed: {source}")]
    RemoteUnavailable {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to build request body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Several independent operations failed in one pass
    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<Error>),
}

/// Coarse classification used for retry decisions and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MalformedInput,
    Conflict,
    Transient,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MalformedInput => "malformed_input",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
        }
    }
}

impl Error {
    /// Map a kube-rs error onto the taxonomy, naming the object involved
    pub fn from_kube(source: kube::Error, kind: &'static str, name: &str) -> Self {
        match source {
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(api_err) if api_err.code == 409 => Self::Conflict {
                kind,
                name: name.to_string(),
            },
            source => Self::Kube {
                context: format!("{kind} {name:?}"),
                source,
            },
        }
    }

    pub fn remote(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::RemoteUnavailable {
            operation,
            source: source.into(),
        }
    }

    /// Collapse a list of failures: none is success, one stays itself
    pub fn aggregate(mut errors: Vec<Error>) -> Result<(), Error> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate(errors)),
        }
    }

    /// Classify for retry purposes
    ///
    /// An aggregate takes the most urgent kind among its members: a conflict
    /// anywhere means a fresh read will likely fix things, otherwise it is
    /// treated as transient.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Kube { .. } | Self::RemoteUnavailable { .. } | Self::Serialization(_) => {
                ErrorKind::Transient
            }
            Self::Aggregate(errors) => {
                if errors.iter().any(|e| e.kind() == ErrorKind::Conflict) {
                    ErrorKind::Conflict
                } else {
                    ErrorKind::Transient
                }
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn format_aggregate(errors: &[Error]) -> String {
    let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} errors: [{}]", errors.len(), parts.join(", "))
}
