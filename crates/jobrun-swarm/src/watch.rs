//! Polling a service until its task terminates or its time budget runs out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobrun_core::JobError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn, Span};

use crate::{ServiceInfo, SwarmClient, TaskState, TaskStatus};

/// Exit code reported for a task the cluster rejected without running it.
pub const REJECTED_EXIT_CODE: i64 = 255;

/// How a service job waits for its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Delay between two status checks.
    pub poll_interval: Duration,

    /// Longest a service may exist before the run is abandoned.
    pub max_run_duration: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_run_duration: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Result of watching a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A task reached a terminal state with this exit code.
    Exited(i64),
    /// The service outlived the maximum run duration.
    TimedOut,
}

impl WatchOutcome {
    pub fn into_result(self) -> Result<(), JobError> {
        match self {
            Self::Exited(0) => Ok(()),
            Self::Exited(code) => Err(JobError::NonZeroExit(code)),
            Self::TimedOut => Err(JobError::MaxTimeRunning),
        }
    }
}

/// Exit code of a service given its tasks, or `None` while none has finished.
///
/// A service without tasks counts as finished with 0: whatever ran is gone.
/// Rejection is an infrastructure failure and never reports 0.
pub fn task_exit_code(tasks: &[TaskStatus]) -> Option<i64> {
    if tasks.is_empty() {
        return Some(0);
    }

    tasks
        .iter()
        .find(|task| task.state.is_terminal())
        .map(|task| match (task.state, task.exit_code) {
            (TaskState::Rejected, None | Some(0)) => REJECTED_EXIT_CODE,
            (TaskState::Failed, None) => REJECTED_EXIT_CODE,
            (_, code) => code.unwrap_or(0),
        })
}

/// Whether a service created at `created_at` has exceeded `max_run_duration` at `now`.
pub(crate) fn deadline_exceeded(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    max_run_duration: Duration,
) -> bool {
    let Ok(budget) = chrono::Duration::from_std(max_run_duration) else {
        return false;
    };

    match now.checked_sub_signed(budget) {
        Some(limit) => created_at < limit,
        None => false,
    }
}

/// Poll `service` on its own timer until it terminates or times out.
///
/// A failed status query is logged and retried on the next tick; only the
/// deadline bounds how long that can go on.
pub(crate) async fn poll_service(
    client: Arc<dyn SwarmClient>,
    service: ServiceInfo,
    config: WatchConfig,
    span: Span,
) -> WatchOutcome {
    let period = config.poll_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if deadline_exceeded(service.created_at, Utc::now(), config.max_run_duration) {
            warn!(
                parent: &span,
                service_id = %service.id,
                max_run_duration_secs = config.max_run_duration.as_secs(),
                "Service exceeded maximum run time"
            );
            return WatchOutcome::TimedOut;
        }

        match client.list_tasks(&service.id).await {
            Ok(tasks) => {
                if let Some(code) = task_exit_code(&tasks) {
                    debug!(
                        parent: &span,
                        service_id = %service.id,
                        exit_code = code,
                        "Task terminated"
                    );
                    return WatchOutcome::Exited(code);
                }
            }
            Err(e) => {
                warn!(
                    parent: &span,
                    service_id = %service.id,
                    error = %e,
                    "Failed to list service tasks, retrying on next tick"
                );
            }
        }
    }
}
