//! Boundary to the Swarm cluster manager.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{ClientError, PullOptions, ServiceDescriptor};

/// Request/response API of the cluster manager used by service jobs.
#[async_trait]
pub trait SwarmClient: Send + Sync {
    /// Pull an image so every node can start the service task.
    async fn pull_image(&self, options: &PullOptions) -> Result<(), ClientError>;

    /// Submit a service and return the cluster-assigned service id.
    async fn create_service(&self, descriptor: &ServiceDescriptor) -> Result<String, ClientError>;

    /// Read back a service.
    async fn inspect_service(&self, id: &str) -> Result<ServiceInfo, ClientError>;

    /// Status of every task bound to a service.
    async fn list_tasks(&self, service_id: &str) -> Result<Vec<TaskStatus>, ClientError>;

    /// Remove a service. Fails with [`ClientError::NoSuchService`] when it is
    /// already gone.
    async fn remove_service(&self, id: &str) -> Result<(), ClientError>;
}

/// What a service job needs to know about a created service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a Swarm task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    New,
    Allocated,
    Pending,
    Assigned,
    Accepted,
    Preparing,
    Ready,
    Starting,
    Running,
    Complete,
    Shutdown,
    Failed,
    Rejected,
    Remove,
    Orphaned,
    /// A state this client does not know about.
    Unknown,
}

impl TaskState {
    /// Parse the lowercase state name used by the Docker API.
    pub fn from_api(state: &str) -> Self {
        match state {
            "new" => Self::New,
            "allocated" => Self::Allocated,
            "pending" => Self::Pending,
            "assigned" => Self::Assigned,
            "accepted" => Self::Accepted,
            "preparing" => Self::Preparing,
            "ready" => Self::Ready,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "complete" => Self::Complete,
            "shutdown" => Self::Shutdown,
            "failed" => Self::Failed,
            "rejected" => Self::Rejected,
            "remove" => Self::Remove,
            "orphaned" => Self::Orphaned,
            _ => Self::Unknown,
        }
    }

    /// Returns true if a task in this state will make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Rejected)
    }
}

/// Polled view of one task backing a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Container exit code, once the container has terminated.
    pub exit_code: Option<i64>,
}

impl TaskStatus {
    pub fn new(state: TaskState, exit_code: Option<i64>) -> Self {
        Self { state, exit_code }
    }

    pub fn running() -> Self {
        Self::new(TaskState::Running, None)
    }
}
