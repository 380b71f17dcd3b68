//! Scriptable in-memory cluster for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    ClientError, PullOptions, ServiceDescriptor, ServiceInfo, SwarmClient, TaskState, TaskStatus,
};

/// How the task of every created service behaves when polled.
#[derive(Debug, Clone)]
pub enum TaskScript {
    /// Report a running task for `after_polls - 1` polls, then `state` with
    /// `exit_code`.
    Exit {
        state: TaskState,
        exit_code: Option<i64>,
        after_polls: usize,
    },
    /// The task never terminates.
    Running,
    /// The service has no tasks at all.
    Vanish,
}

impl Default for TaskScript {
    fn default() -> Self {
        Self::Exit {
            state: TaskState::Complete,
            exit_code: Some(0),
            after_polls: 1,
        }
    }
}

/// What `remove_service` does.
#[derive(Debug, Clone, Default)]
pub enum RemoveBehavior {
    #[default]
    Remove,
    /// Report the service as already gone.
    NotFound,
    /// Fail with an API error carrying this message.
    Fail(String),
}

#[derive(Default)]
struct State {
    next_id: u64,
    services: HashMap<String, ServiceInfo>,
    polls: HashMap<String, usize>,
    created: Vec<ServiceDescriptor>,
    pulled: Vec<PullOptions>,
    list_calls: usize,
    remove_calls: usize,
}

/// In-memory [`SwarmClient`] whose behavior is fixed at construction.
pub struct FakeSwarm {
    script: TaskScript,
    remove: RemoveBehavior,
    created_at_offset: Duration,
    pull_error: Option<String>,
    create_error: Option<String>,
    inspect_error: Option<String>,
    list_error: Option<String>,
    state: Mutex<State>,
}

impl Default for FakeSwarm {
    fn default() -> Self {
        Self {
            script: TaskScript::default(),
            remove: RemoveBehavior::default(),
            created_at_offset: Duration::zero(),
            pull_error: None,
            create_error: None,
            inspect_error: None,
            list_error: None,
            state: Mutex::new(State::default()),
        }
    }
}

impl FakeSwarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: TaskScript) -> Self {
        self.script = script;
        self
    }

    pub fn with_remove(mut self, remove: RemoveBehavior) -> Self {
        self.remove = remove;
        self
    }

    /// Shift the creation time of every service, negative to backdate.
    pub fn with_created_at_offset(mut self, offset: Duration) -> Self {
        self.created_at_offset = offset;
        self
    }

    pub fn failing_pull(mut self, message: impl Into<String>) -> Self {
        self.pull_error = Some(message.into());
        self
    }

    pub fn failing_create(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    pub fn failing_inspect(mut self, message: impl Into<String>) -> Self {
        self.inspect_error = Some(message.into());
        self
    }

    pub fn failing_list(mut self, message: impl Into<String>) -> Self {
        self.list_error = Some(message.into());
        self
    }

    /// Services currently present.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.lock().services.values().cloned().collect()
    }

    /// Descriptors of every created service, in order.
    pub fn created(&self) -> Vec<ServiceDescriptor> {
        self.lock().created.clone()
    }

    pub fn pulled(&self) -> Vec<PullOptions> {
        self.lock().pulled.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.lock().remove_calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SwarmClient for FakeSwarm {
    async fn pull_image(&self, options: &PullOptions) -> Result<(), ClientError> {
        if let Some(message) = &self.pull_error {
            return Err(ClientError::Api(message.clone()));
        }
        self.lock().pulled.push(options.clone());
        Ok(())
    }

    async fn create_service(&self, descriptor: &ServiceDescriptor) -> Result<String, ClientError> {
        if let Some(message) = &self.create_error {
            return Err(ClientError::Api(message.clone()));
        }

        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("svc-{}", state.next_id);
        let info = ServiceInfo {
            id: id.clone(),
            name: descriptor.name.clone(),
            created_at: Utc::now() + self.created_at_offset,
        };
        state.services.insert(id.clone(), info);
        state.created.push(descriptor.clone());
        Ok(id)
    }

    async fn inspect_service(&self, id: &str) -> Result<ServiceInfo, ClientError> {
        if let Some(message) = &self.inspect_error {
            return Err(ClientError::Api(message.clone()));
        }
        self.lock()
            .services
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NoSuchService(id.to_string()))
    }

    async fn list_tasks(&self, service_id: &str) -> Result<Vec<TaskStatus>, ClientError> {
        let mut state = self.lock();
        state.list_calls += 1;

        if let Some(message) = &self.list_error {
            return Err(ClientError::Api(message.clone()));
        }

        let polls = state.polls.entry(service_id.to_string()).or_insert(0);
        *polls += 1;

        let tasks = match &self.script {
            TaskScript::Exit {
                state: task_state,
                exit_code,
                after_polls,
            } if *polls >= *after_polls => vec![TaskStatus::new(*task_state, *exit_code)],
            TaskScript::Exit { .. } | TaskScript::Running => vec![TaskStatus::running()],
            TaskScript::Vanish => Vec::new(),
        };
        Ok(tasks)
    }

    async fn remove_service(&self, id: &str) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.remove_calls += 1;

        match &self.remove {
            RemoveBehavior::Remove => state
                .services
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| ClientError::NoSuchService(id.to_string())),
            RemoveBehavior::NotFound => {
                state.services.remove(id);
                Err(ClientError::NoSuchService(id.to_string()))
            }
            RemoveBehavior::Fail(message) => Err(ClientError::Api(message.clone())),
        }
    }
}
