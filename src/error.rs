// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplizierenError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Cluster cache for {0} is not available")]
    CacheUnavailable(String),

    #[error("Failed to patch deployment {namespace}/{name}: {source}")]
    RolloutError {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl ReplizierenError {
    /// HTTP status code of the API error, if this error came from the API server
    pub fn api_code(&self) -> Option<u16> {
        match self {
            ReplizierenError::KubeError(kube::Error::Api(err)) => Some(err.code),
            ReplizierenError::RolloutError {
                source: kube::Error::Api(err),
                ..
            } => Some(err.code),
            _ => None,
        }
    }

    /// The object (or the namespace it should live in) does not exist
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// A concurrent write changed the object since it was read
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    /// The operator is not allowed to touch the object
    pub fn is_forbidden(&self) -> bool {
        self.api_code() == Some(403)
    }

    /// The API server rejected the payload, e.g. a change to an immutable field
    pub fn is_invalid(&self) -> bool {
        self.api_code() == Some(422)
    }

    /// Whether the reconciliation should be retried with backoff.
    /// NotFound, Forbidden and Invalid are skipped, everything else is retried.
    pub fn is_retryable(&self) -> bool {
        !(self.is_not_found() || self.is_forbidden() || self.is_invalid())
    }
}

pub type Result<T> = std::result::Result<T, ReplizierenError>;
