//! Error types for Swarm service jobs.

use jobrun_core::JobError;
use thiserror::Error;

/// Errors returned by a [`SwarmClient`](crate::SwarmClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service does not exist (anymore).
    #[error("no such service: {0}")]
    NoSuchService(String),

    /// Failed to reach the Docker daemon.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other error reported by the Docker API.
    #[error("Docker API error: {0}")]
    Api(String),
}

/// Stage failures of a service job run, wrapped with what was being done.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Pulling the job image failed.
    #[error("error pulling image {image:?}: {source}")]
    PullImage {
        image: String,
        #[source]
        source: ClientError,
    },

    /// The service descriptor was rejected.
    #[error("error creating service {name:?} for image {image:?}: {source}")]
    CreateService {
        name: String,
        image: String,
        #[source]
        source: ClientError,
    },

    /// The freshly created service could not be read back.
    #[error("failed to inspect service {id}: {source}")]
    InspectService {
        id: String,
        #[source]
        source: ClientError,
    },

    /// Removing the service failed for a reason other than it being gone.
    #[error("error deleting service {id}: {source}")]
    RemoveService {
        id: String,
        #[source]
        source: ClientError,
    },

    /// The background watch task did not finish normally.
    #[error("watch task for service {id} failed: {message}")]
    WatchTask { id: String, message: String },
}

impl From<SwarmError> for JobError {
    fn from(err: SwarmError) -> Self {
        JobError::Failed(err.to_string())
    }
}
