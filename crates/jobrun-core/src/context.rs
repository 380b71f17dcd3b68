//! Per-run context handed to middlewares and jobs.

use std::sync::Arc;

use tracing::{info_span, Span};

use crate::{Execution, Job, JobError};

/// Mutable carrier for a single run of a Job.
///
/// A context is owned by exactly one run and never shared between concurrent
/// runs of the same job. Creating it marks the job as running; closing the
/// execution through [`Context::stop`] releases it again.
pub struct Context {
    /// The job being run.
    pub job: Arc<dyn Job>,

    /// Record of this run.
    pub execution: Execution,

    /// `<name>_<unix-timestamp>` of this run.
    pub instance_name: String,

    /// Span every event of this run is recorded under.
    pub span: Span,
}

impl Context {
    /// Create the context for a new run of `job`.
    pub fn new(job: Arc<dyn Job>) -> Self {
        let execution = Execution::new();
        let instance_name = job.bare().instance_name(execution.started_at);
        let span = info_span!(
            "job_run",
            job = %job.name(),
            instance = %instance_name,
            execution_id = %execution.id,
        );

        job.bare().notify_start();

        Self {
            job,
            execution,
            instance_name,
            span,
        }
    }

    /// Close the execution with `result`.
    ///
    /// Only the first call has an effect; it does not touch the chain, later
    /// stages simply observe [`Context::is_stopped`].
    pub fn stop(&mut self, result: Result<(), JobError>) -> bool {
        if !self.execution.stop(result) {
            return false;
        }
        self.job.bare().notify_stop();
        true
    }

    /// Whether the execution has been closed.
    pub fn is_stopped(&self) -> bool {
        !self.execution.is_running
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.execution.is_running {
            self.job.bare().notify_stop();
        }
    }
}
