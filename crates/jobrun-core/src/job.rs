//! The `Job` trait and the fields shared by every job variant.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{Context, JobError};

/// Fields common to all job variants.
///
/// Every variant embeds a `BareJob` and exposes it through [`Job::bare`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BareJob {
    /// Job name, unique within a scheduler.
    pub name: String,

    /// Schedule expression, interpreted by the external scheduler only.
    pub schedule: String,

    /// Command to run inside the workload.
    pub command: String,

    #[serde(skip)]
    running: AtomicU32,
}

impl BareJob {
    /// Create a new BareJob.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the schedule expression.
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    /// Name of the run started at `at`: `<name>_<unix-timestamp>`.
    pub fn instance_name(&self, at: DateTime<Utc>) -> String {
        format!("{}_{}", self.name, at.timestamp())
    }

    /// Number of invocations currently in flight.
    pub fn running(&self) -> u32 {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn notify_start(&self) {
        self.running.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn notify_stop(&self) {
        let _ = self
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// A schedulable unit of work.
///
/// Implementations hold their variant-specific parameters and are shared
/// between runs; all per-run state lives on the [`Context`].
#[async_trait]
pub trait Job: Send + Sync {
    /// Shared identity fields.
    fn bare(&self) -> &BareJob;

    fn name(&self) -> &str {
        &self.bare().name
    }

    fn command(&self) -> &str {
        &self.bare().command
    }

    fn schedule(&self) -> &str {
        &self.bare().schedule
    }

    fn running(&self) -> u32 {
        self.bare().running()
    }

    /// Execute the job body. Called as the innermost stage of the chain.
    async fn run(&self, ctx: &mut Context) -> Result<(), JobError>;
}

/// Tokenize a command line on whitespace.
///
/// No quoting rules apply: `echo "a b"` yields `["echo", "\"a", "b\""]`.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_instance_name_uses_unix_timestamp() {
        let job = BareJob::new("backup", "tar -czf /tmp/x.tgz /data");
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        assert_eq!(job.instance_name(at), "backup_1700000000");
        assert_eq!(job.instance_name(at), job.instance_name(at));
    }

    #[test]
    fn test_instance_name_differs_between_runs() {
        let job = BareJob::new("backup", "true");
        let first = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let second = Utc.timestamp_opt(1_700_000_060, 0).unwrap();

        assert_ne!(job.instance_name(first), job.instance_name(second));
    }

    #[test]
    fn test_running_counter_never_underflows() {
        let job = BareJob::new("counter", "true");
        job.notify_start();
        job.notify_start();
        assert_eq!(job.running(), 2);

        job.notify_stop();
        job.notify_stop();
        job.notify_stop();
        assert_eq!(job.running(), 0);
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command(r#"echo -a "foo bar""#),
            vec!["echo", "-a", "\"foo", "bar\""]
        );
        assert!(split_command("   ").is_empty());
    }
}
