//! Command line configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use jobrun_core::{BareJob, Chain};
use jobrun_local::LocalJobSpec;
use jobrun_middlewares::{Logging, Overlap, Slack, SlackConfig};
use jobrun_swarm::{ServiceJobSpec, WatchConfig};

/// JobRun - run a job once through the middleware chain
#[derive(Parser, Debug)]
#[command(name = "jobrun")]
#[command(about = "Run a job once, as a Swarm service or a local process", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the job as a one-shot Swarm service
    Service {
        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Run the job as a local process
    Local {
        #[command(flatten)]
        job: JobArgs,

        /// Working directory of the process
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        chain: ChainArgs,
    },
}

/// Fields shared by every job variant.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Job name, the prefix of every instance name
    #[arg(long, env = "JOBRUN_NAME")]
    pub name: String,

    /// Command to run, split on whitespace
    #[arg(long, env = "JOBRUN_COMMAND", default_value = "")]
    pub command: String,
}

impl JobArgs {
    pub fn bare_job(&self) -> BareJob {
        BareJob::new(&self.name, &self.command)
    }
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Image to run
    #[arg(long, env = "JOBRUN_IMAGE")]
    pub image: String,

    /// Network to attach the service to
    #[arg(long, env = "JOBRUN_NETWORK")]
    pub network: Option<String>,

    /// Private registry hosting the image
    #[arg(long, env = "JOBRUN_REGISTRY")]
    pub registry: Option<String>,

    /// GELF endpoint for the task logs
    #[arg(long, env = "JOBRUN_LOGGING_GELF_ADDRESS")]
    pub logging_gelf_address: Option<String>,

    /// Placement constraint, e.g. "node.role == worker"
    #[arg(long, env = "JOBRUN_PLACEMENT_CONSTRAINT")]
    pub placement_constraint: Option<String>,

    /// Keep the service after the run
    #[arg(long)]
    pub keep: bool,

    /// Delay between status checks, in milliseconds
    #[arg(long, default_value = "500")]
    pub poll_interval_ms: u64,

    /// Longest a service may run, in seconds
    #[arg(long, env = "JOBRUN_MAX_RUNTIME_SECS", default_value = "86400")]
    pub max_runtime_secs: u64,
}

impl ServiceArgs {
    pub fn spec(&self) -> ServiceJobSpec {
        ServiceJobSpec {
            network: self.network.clone(),
            registry: self.registry.clone(),
            logging_gelf_address: self.logging_gelf_address.clone(),
            placement_constraint: self.placement_constraint.clone(),
            delete: !self.keep,
            ..ServiceJobSpec::new(&self.image)
        }
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_run_duration: Duration::from_secs(self.max_runtime_secs),
        }
    }
}

/// Middleware settings.
#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Skip the run if another run of the job is still in flight
    #[arg(long)]
    pub no_overlap: bool,

    /// Slack incoming webhook receiving run reports
    #[arg(long, env = "JOBRUN_SLACK_WEBHOOK", default_value = "")]
    pub slack_webhook: String,

    /// Only report failed runs to Slack
    #[arg(long)]
    pub slack_only_on_error: bool,

    /// Logs link added to failure reports, "###instance_name###" is substituted
    #[arg(long, env = "JOBRUN_SLACK_LOGS_URL", default_value = "")]
    pub slack_logs_url: String,
}

impl ChainArgs {
    pub fn chain(&self) -> Chain {
        let mut chain = Chain::new()
            .with(Logging)
            .with(Overlap::new(self.no_overlap));

        let slack = Slack::new(SlackConfig {
            slack_webhook: self.slack_webhook.clone(),
            slack_only_on_error: self.slack_only_on_error,
            slack_logs_url: self.slack_logs_url.clone(),
        });
        if let Some(slack) = slack {
            chain.push(Arc::new(slack));
        }

        chain
    }
}

pub fn local_spec(dir: Option<PathBuf>) -> LocalJobSpec {
    LocalJobSpec {
        dir,
        ..Default::default()
    }
}
