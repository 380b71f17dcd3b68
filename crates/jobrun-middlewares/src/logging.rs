//! Run lifecycle logging.

use async_trait::async_trait;
use jobrun_core::{Context, JobError, Middleware, Next};
use tracing::{error, info, warn};

/// Logs the start of every run and its final outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

#[async_trait]
impl Middleware for Logging {
    fn name(&self) -> &str {
        "logging"
    }

    fn continue_on_stop(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
        info!(parent: &ctx.span, command = %ctx.job.command(), "Started");

        let result = next.run(ctx).await;
        ctx.stop(result.clone());

        let execution = &ctx.execution;
        let duration = execution.duration.unwrap_or_default();
        if execution.failed {
            error!(
                parent: &ctx.span,
                duration = ?duration,
                error = %execution.error.as_ref().map(ToString::to_string).unwrap_or_default(),
                "Finished with failure"
            );
        } else if execution.skipped {
            warn!(parent: &ctx.span, duration = ?duration, "Skipped");
        } else {
            info!(parent: &ctx.span, duration = ?duration, "Finished");
        }

        result
    }
}
