//! Guard against concurrent runs of the same job.

use async_trait::async_trait;
use jobrun_core::{Context, JobError, Middleware, Next};
use tracing::info;

/// Skips a run while another run of the same job is still in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlap {
    pub no_overlap: bool,
}

impl Overlap {
    pub fn new(no_overlap: bool) -> Self {
        Self { no_overlap }
    }
}

#[async_trait]
impl Middleware for Overlap {
    fn name(&self) -> &str {
        "overlap"
    }

    async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
        // The current run is already counted.
        if self.no_overlap && ctx.job.running() > 1 {
            info!(
                parent: &ctx.span,
                running = ctx.job.running(),
                "Skipping run, a previous one is still in flight"
            );
            ctx.stop(Err(JobError::Skipped));
        }

        next.run(ctx).await
    }
}
