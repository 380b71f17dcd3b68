//! Jobs running their command as a child process of the current host.
//!
//! Useful to run the same middleware chain without a cluster, and as the
//! simplest job variant next to the Swarm service runner.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use jobrun_core::{split_command, BareJob, Context, Job, JobError};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

/// Process parameters of a local job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalJobSpec {
    /// Working directory, the current one when unset.
    pub dir: Option<PathBuf>,

    /// Extra environment variables.
    pub environment: HashMap<String, String>,
}

/// Runs a job's command directly, capturing its output.
pub struct LocalJob {
    bare: BareJob,
    spec: LocalJobSpec,
}

impl LocalJob {
    pub fn new(bare: BareJob, spec: LocalJobSpec) -> Self {
        Self { bare, spec }
    }

    pub fn spec(&self) -> &LocalJobSpec {
        &self.spec
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let argv = split_command(self.command());
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| JobError::Failed("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.spec.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.spec.dir {
            cmd.current_dir(dir);
        }

        Ok(cmd)
    }
}

#[async_trait]
impl Job for LocalJob {
    fn bare(&self) -> &BareJob {
        &self.bare
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), JobError> {
        let mut cmd = self.build_command()?;
        debug!(parent: &ctx.span, command = %self.command(), "Spawning local process");

        let output = cmd.output().await.map_err(|e| {
            JobError::Failed(format!("failed to start {:?}: {}", self.command(), e))
        })?;

        ctx.execution.append_output(&String::from_utf8_lossy(&output.stdout));
        ctx.execution.append_output(&String::from_utf8_lossy(&output.stderr));

        info!(
            parent: &ctx.span,
            exit_code = ?output.status.code(),
            output_bytes = ctx.execution.output.len(),
            "Local process exited"
        );

        match output.status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(JobError::NonZeroExit(i64::from(code))),
            None => Err(JobError::Failed(format!(
                "process terminated by signal: {}",
                output.status
            ))),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use jobrun_core::Chain;
    use std::sync::Arc;

    fn local(command: &str) -> Arc<dyn Job> {
        Arc::new(LocalJob::new(
            BareJob::new("local", command),
            LocalJobSpec::default(),
        ))
    }

    #[tokio::test]
    async fn test_captures_output() {
        let report = Chain::new().run(local("echo hello world")).await;

        assert_eq!(report.result, Ok(()));
        assert_eq!(report.execution.output, "hello world\n");
        assert!(!report.execution.failed);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let report = Chain::new().run(local("false")).await;

        assert_eq!(report.result, Err(JobError::NonZeroExit(1)));
        assert!(report.execution.failed);
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let report = Chain::new().run(local("   ")).await;

        assert_eq!(
            report.result,
            Err(JobError::Failed("empty command".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let report = Chain::new()
            .run(local("definitely-not-a-real-binary-4242"))
            .await;

        let err = report.result.unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_environment_and_dir() {
        let mut spec = LocalJobSpec {
            dir: Some(PathBuf::from("/")),
            ..Default::default()
        };
        spec.environment.insert("JOBRUN_GREETING".to_string(), "hi".to_string());
        let job: Arc<dyn Job> = Arc::new(LocalJob::new(BareJob::new("env", "env"), spec));

        let report = Chain::new().run(job).await;

        assert_eq!(report.result, Ok(()));
        assert!(report.execution.output.contains("JOBRUN_GREETING=hi"));
    }

    #[tokio::test]
    async fn test_signal_is_failure() {
        let report = Chain::new().run(local("sh -c kill${IFS}-9${IFS}$$")).await;

        match report.result {
            Err(JobError::Failed(message)) => assert!(message.contains("signal")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
