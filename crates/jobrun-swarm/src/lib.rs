//! One-shot Docker Swarm service jobs.
//!
//! A [`RunServiceJob`] turns a job run into a Swarm service whose restart
//! policy allows a single attempt, waits for its task to reach a terminal
//! state, and removes the service afterwards.
//!
//! The cluster is reached through the [`SwarmClient`] trait. [`DockerSwarm`]
//! talks to a real Docker daemon; with the `testing` feature, `FakeSwarm`
//! provides a scriptable in-memory cluster.

mod client;
mod docker;
mod error;
mod image;
mod job;
mod service;
mod watch;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ServiceInfo, SwarmClient, TaskState, TaskStatus};
pub use docker::DockerSwarm;
pub use error::{ClientError, SwarmError};
pub use image::{full_image_name, PullOptions};
pub use job::{RunServiceJob, ServiceJobSpec};
pub use service::{LogDriver, RestartCondition, RestartPolicy, ServiceDescriptor};
pub use watch::{task_exit_code, WatchConfig, WatchOutcome, REJECTED_EXIT_CODE};
