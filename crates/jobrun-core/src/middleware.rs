//! Middleware chain wrapping a job body.
//!
//! A chain is an ordered list of [`Middleware`]s. Each stage receives the run
//! [`Context`] and a [`Next`] continuation for the rest of the chain; the job
//! body sits at the end. A stage observes the final outcome by awaiting
//! `next.run(ctx)` and inspecting `ctx.execution` afterwards.
//!
//! Once a stage stops the context, the remaining stages only run if they
//! return `true` from [`Middleware::continue_on_stop`], and the job body is
//! never invoked.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::{debug, trace, Instrument};

use crate::{Context, Execution, Job, JobError};

/// An interceptor around a job run.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether this stage still runs after the context has been stopped.
    fn continue_on_stop(&self) -> bool {
        false
    }

    /// Run the stage. Call `next.run(ctx)` to continue the chain.
    async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError>;
}

/// Continuation for the remainder of a chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    job: &'a dyn Job,
}

impl<'a> Next<'a> {
    /// Continuation running `middlewares` in order, then `job`.
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], job: &'a dyn Job) -> Self {
        Self { middlewares, job }
    }

    /// Invoke the next stage, or the job body at the end of the chain.
    ///
    /// Running the job body closes the execution with its result. On a
    /// stopped context the outcome already recorded on the execution is
    /// returned instead.
    pub fn run<'c>(self, ctx: &'c mut Context) -> BoxFuture<'c, Result<(), JobError>>
    where
        'a: 'c,
    {
        Box::pin(async move {
            let mut remaining = self.middlewares;
            while let Some((middleware, rest)) = remaining.split_first() {
                if !ctx.is_stopped() || middleware.continue_on_stop() {
                    let next = Next {
                        middlewares: rest,
                        job: self.job,
                    };
                    return middleware.run(ctx, next).await;
                }

                trace!(
                    parent: &ctx.span,
                    middleware = middleware.name(),
                    "Skipping middleware on stopped run"
                );
                remaining = rest;
            }

            if ctx.is_stopped() {
                return ctx.execution.result();
            }

            let result = self.job.run(ctx).await;
            ctx.stop(result.clone());
            result
        })
    }
}

/// Outcome of a chain run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Closed execution record.
    pub execution: Execution,

    /// Instance name used by the run.
    pub instance_name: String,

    /// Error returned by the outermost stage.
    pub result: Result<(), JobError>,
}

/// Ordered list of middlewares applied to every run.
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to append a middleware.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a shared middleware.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of middlewares in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain has no middlewares.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run `job` once through the chain.
    ///
    /// The execution is always closed when this returns, whatever the stages
    /// did with the context.
    pub async fn run(&self, job: Arc<dyn Job>) -> RunReport {
        let mut ctx = Context::new(Arc::clone(&job));
        let span = ctx.span.clone();

        let result = Next::new(&self.middlewares, job.as_ref())
            .run(&mut ctx)
            .instrument(span)
            .await;
        ctx.stop(result.clone());

        debug!(
            parent: &ctx.span,
            failed = ctx.execution.failed,
            skipped = ctx.execution.skipped,
            "Chain finished"
        );

        RunReport {
            execution: ctx.execution.clone(),
            instance_name: ctx.instance_name.clone(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BareJob;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    struct RecordingJob {
        bare: BareJob,
        journal: Journal,
        result: Result<(), JobError>,
    }

    impl RecordingJob {
        fn new(journal: &Journal, result: Result<(), JobError>) -> Arc<Self> {
            Arc::new(Self {
                bare: BareJob::new("recording", "true"),
                journal: journal.clone(),
                result,
            })
        }
    }

    #[async_trait]
    impl Job for RecordingJob {
        fn bare(&self) -> &BareJob {
            &self.bare
        }

        async fn run(&self, ctx: &mut Context) -> Result<(), JobError> {
            self.journal.lock().unwrap().push("job".to_string());
            ctx.execution.append_output("hello");
            self.result.clone()
        }
    }

    /// Records entry and exit around `next`.
    struct Around {
        name: &'static str,
        continue_on_stop: bool,
        journal: Journal,
    }

    impl Around {
        fn new(name: &'static str, continue_on_stop: bool, journal: &Journal) -> Self {
            Self {
                name,
                continue_on_stop,
                journal: journal.clone(),
            }
        }
    }

    #[async_trait]
    impl Middleware for Around {
        fn name(&self) -> &str {
            self.name
        }

        fn continue_on_stop(&self) -> bool {
            self.continue_on_stop
        }

        async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
            self.journal.lock().unwrap().push(format!("{}:pre", self.name));
            let result = next.run(ctx).await;
            self.journal.lock().unwrap().push(format!("{}:post", self.name));
            result
        }
    }

    /// Stops the context before continuing.
    struct Veto {
        journal: Journal,
    }

    #[async_trait]
    impl Middleware for Veto {
        fn name(&self) -> &str {
            "veto"
        }

        async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
            self.journal.lock().unwrap().push("veto:pre".to_string());
            ctx.stop(Err(JobError::failed("vetoed")));
            next.run(ctx).await
        }
    }

    /// Swallows whatever error the rest of the chain returns.
    struct Suppress;

    #[async_trait]
    impl Middleware for Suppress {
        fn name(&self) -> &str {
            "suppress"
        }

        async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
            let _ = next.run(ctx).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stages_wrap_job_in_order() {
        let journal = journal();
        let chain = Chain::new()
            .with(Around::new("a", false, &journal))
            .with(Around::new("b", false, &journal));

        let report = chain.run(RecordingJob::new(&journal, Ok(()))).await;

        assert!(report.result.is_ok());
        assert_eq!(
            entries(&journal),
            vec!["a:pre", "b:pre", "job", "b:post", "a:post"]
        );
        assert!(!report.execution.is_running);
        assert!(!report.execution.failed);
        assert_eq!(report.execution.output, "hello");
    }

    #[tokio::test]
    async fn test_job_error_propagates_and_fails_execution() {
        let journal = journal();
        let chain = Chain::new().with(Around::new("a", false, &journal));

        let report = chain
            .run(RecordingJob::new(&journal, Err(JobError::NonZeroExit(3))))
            .await;

        assert_eq!(report.result, Err(JobError::NonZeroExit(3)));
        assert!(report.execution.failed);
        assert_eq!(report.execution.error, Some(JobError::NonZeroExit(3)));
    }

    #[tokio::test]
    async fn test_stop_skips_job_and_stop_sensitive_stages() {
        let journal = journal();
        let chain = Chain::new()
            .with(Around::new("a", false, &journal))
            .with(Veto {
                journal: journal.clone(),
            })
            .with(Around::new("c", false, &journal))
            .with(Around::new("notify", true, &journal));

        let report = chain.run(RecordingJob::new(&journal, Ok(()))).await;

        assert_eq!(
            entries(&journal),
            vec!["a:pre", "veto:pre", "notify:pre", "notify:post", "a:post"]
        );
        assert_eq!(report.result, Err(JobError::failed("vetoed")));
        assert!(report.execution.failed);
    }

    #[tokio::test]
    async fn test_skipped_run_is_not_failed() {
        struct Skip;

        #[async_trait]
        impl Middleware for Skip {
            fn name(&self) -> &str {
                "skip"
            }

            async fn run(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), JobError> {
                ctx.stop(Err(JobError::Skipped));
                next.run(ctx).await
            }
        }

        let journal = journal();
        let report = Chain::new()
            .with(Skip)
            .run(RecordingJob::new(&journal, Ok(())))
            .await;

        assert!(report.result.is_ok());
        assert!(report.execution.skipped);
        assert!(!report.execution.failed);
        assert!(entries(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_suppressing_middleware_keeps_execution_failed() {
        let journal = journal();
        let report = Chain::new()
            .with(Suppress)
            .run(RecordingJob::new(&journal, Err(JobError::failed("boom"))))
            .await;

        assert!(report.result.is_ok());
        assert!(report.execution.failed);
        assert_eq!(report.execution.error, Some(JobError::failed("boom")));
    }

    #[tokio::test]
    async fn test_empty_chain_runs_job_and_releases_it() {
        let journal = journal();
        let job = RecordingJob::new(&journal, Ok(()));

        let report = Chain::new().run(job.clone()).await;

        assert!(report.result.is_ok());
        assert_eq!(entries(&journal), vec!["job"]);
        assert_eq!(job.running(), 0);
        assert!(report.instance_name.starts_with("recording_"));
    }
}
