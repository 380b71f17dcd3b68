//! JobRun Core Domain Types
//!
//! This crate contains the pieces every job variant shares:
//! - the execution record of a single run
//! - the per-run context handed to middlewares and jobs
//! - the middleware chain that wraps a job body
//! - the `Job` trait and the `BareJob` fields common to all variants
//!
//! It has no dependency on a container runtime or an async executor.

pub mod context;
pub mod error;
pub mod execution;
pub mod ids;
pub mod job;
pub mod middleware;

// Re-export commonly used types
pub use context::Context;
pub use error::JobError;
pub use execution::Execution;
pub use ids::ExecutionId;
pub use job::{split_command, BareJob, Job};
pub use middleware::{Chain, Middleware, Next, RunReport};
