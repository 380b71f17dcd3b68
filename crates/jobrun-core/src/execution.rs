//! Execution record of a single job run.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{ExecutionId, JobError};

/// Record of one invocation of a Job.
///
/// Created running when the context is built and closed exactly once through
/// [`Execution::stop`]. After it is closed the record no longer changes.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Unique execution identifier.
    pub id: ExecutionId,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run was closed.
    pub finished_at: Option<DateTime<Utc>>,

    /// Wall time between start and close.
    pub duration: Option<Duration>,

    /// True until the execution is closed.
    pub is_running: bool,

    /// The run ended with an error.
    pub failed: bool,

    /// The run was skipped by a middleware.
    pub skipped: bool,

    /// Terminal error, if the run failed.
    pub error: Option<JobError>,

    /// Output captured from the workload, if the job variant collects it.
    pub output: String,
}

impl Execution {
    /// Create a new running execution starting now.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Create a new running execution with an explicit start time.
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            id: ExecutionId::generate(),
            started_at,
            finished_at: None,
            duration: None,
            is_running: true,
            failed: false,
            skipped: false,
            error: None,
            output: String::new(),
        }
    }

    /// Close the execution with the outcome of the run.
    ///
    /// Only the first call has an effect. Returns `true` if this call closed
    /// the execution.
    pub fn stop(&mut self, result: Result<(), JobError>) -> bool {
        if !self.is_running {
            return false;
        }

        let now = Utc::now();
        self.is_running = false;
        self.finished_at = Some(now);
        self.duration = Some((now - self.started_at).to_std().unwrap_or_default());

        match result {
            Ok(()) => {}
            Err(JobError::Skipped) => self.skipped = true,
            Err(err) => {
                self.failed = true;
                self.error = Some(err);
            }
        }

        true
    }

    /// The outcome recorded on this execution.
    ///
    /// Skipped and successful runs both yield `Ok(())`.
    pub fn result(&self) -> Result<(), JobError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Append captured workload output.
    pub fn append_output(&mut self, chunk: &str) {
        self.output.push_str(chunk);
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::new()
    }
}
