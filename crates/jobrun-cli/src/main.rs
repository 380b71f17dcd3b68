//! JobRun CLI - run a single job through the middleware chain.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jobrun_core::{Chain, Job, RunReport};
use jobrun_local::LocalJob;
use jobrun_swarm::{DockerSwarm, RunServiceJob, SwarmClient};

mod config;

use config::{local_spec, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobrun=info".parse()?))
        .with_target(true)
        .init();

    let (job, chain): (Arc<dyn Job>, Chain) = match cli.command {
        Commands::Service {
            job,
            service,
            chain,
        } => {
            let client: Arc<dyn SwarmClient> = Arc::new(DockerSwarm::connect()?);
            let runner = RunServiceJob::new(job.bare_job(), service.spec(), client)
                .with_watch_config(service.watch_config());
            let runner: Arc<dyn Job> = Arc::new(runner);
            (runner, chain.chain())
        }
        Commands::Local { job, dir, chain } => {
            let runner: Arc<dyn Job> = Arc::new(LocalJob::new(job.bare_job(), local_spec(dir)));
            (runner, chain.chain())
        }
    };

    info!(job = %job.name(), middlewares = chain.len(), "Running job");
    let report = chain.run(job).await;
    print_report(&report);

    if let Err(e) = &report.result {
        error!(instance = %report.instance_name, error = %e, "Job failed");
    }
    report.result?;

    Ok(())
}

fn print_report(report: &RunReport) {
    let execution = &report.execution;
    let status = if execution.failed {
        "failed"
    } else if execution.skipped {
        "skipped"
    } else {
        "succeeded"
    };

    println!("{:<12} {}", "INSTANCE", report.instance_name);
    println!("{:<12} {}", "EXECUTION", execution.id);
    println!("{:<12} {}", "STATUS", status);
    println!(
        "{:<12} {:?}",
        "DURATION",
        execution.duration.unwrap_or_default()
    );
    if let Some(err) = &execution.error {
        println!("{:<12} {}", "ERROR", err);
    }
    if !execution.output.is_empty() {
        println!("{}", "-".repeat(40));
        print!("{}", execution.output);
    }
}
