//! Job variant running its command as a one-shot Swarm service.

use std::sync::Arc;

use async_trait::async_trait;
use jobrun_core::{split_command, BareJob, Context, Job, JobError};
use serde::Deserialize;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::watch::poll_service;
use crate::{
    full_image_name, ClientError, LogDriver, PullOptions, ServiceDescriptor, SwarmClient,
    SwarmError, WatchConfig,
};

/// Execution parameters of a service job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceJobSpec {
    /// Image reference, without the registry host.
    pub image: String,

    /// Network to attach the service to.
    pub network: Option<String>,

    /// Private registry hosting the image.
    pub registry: Option<String>,

    /// Run-as user. Not applicable to a service task.
    pub user: String,

    /// Allocate a pseudo-TTY. Not applicable to a service task.
    pub tty: bool,

    /// Remove the service once the run is over.
    pub delete: bool,

    /// GELF endpoint receiving the task logs.
    pub logging_gelf_address: Option<String>,

    /// Placement constraint, e.g. `node.role == worker`.
    pub placement_constraint: Option<String>,
}

impl Default for ServiceJobSpec {
    fn default() -> Self {
        Self {
            image: String::new(),
            network: None,
            registry: None,
            user: "root".to_string(),
            tty: false,
            delete: true,
            logging_gelf_address: None,
            placement_constraint: None,
        }
    }
}

impl ServiceJobSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }
}

/// Runs a job as a Swarm service restricted to a single attempt.
///
/// Each run pulls the image, creates the service, waits for its task to
/// terminate (or for the maximum run duration to pass) and removes the
/// service again, whatever the outcome.
pub struct RunServiceJob {
    bare: BareJob,
    spec: ServiceJobSpec,
    watch: WatchConfig,
    client: Arc<dyn SwarmClient>,
}

impl RunServiceJob {
    pub fn new(bare: BareJob, spec: ServiceJobSpec, client: Arc<dyn SwarmClient>) -> Self {
        Self {
            bare,
            spec,
            watch: WatchConfig::default(),
            client,
        }
    }

    /// Builder method to set how the service is watched.
    pub fn with_watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    pub fn spec(&self) -> &ServiceJobSpec {
        &self.spec
    }

    pub fn watch_config(&self) -> &WatchConfig {
        &self.watch
    }

    fn image_name(&self) -> String {
        full_image_name(self.spec.registry.as_deref(), &self.spec.image)
    }

    /// Descriptor of the service backing the run named `instance_name`.
    pub fn build_descriptor(&self, instance_name: &str) -> ServiceDescriptor {
        let mut descriptor = ServiceDescriptor::new(instance_name, self.image_name())
            .with_command(split_command(self.command()));

        if let Some(network) = non_empty(&self.spec.network) {
            descriptor = descriptor.with_network(network);
        }
        if let Some(address) = non_empty(&self.spec.logging_gelf_address) {
            descriptor = descriptor.with_log_driver(LogDriver::gelf(address));
        }
        if let Some(constraint) = non_empty(&self.spec.placement_constraint) {
            descriptor = descriptor.with_placement_constraint(constraint);
        }

        descriptor
    }

    async fn pull_image(&self) -> Result<(), SwarmError> {
        let options = PullOptions::parse(&self.spec.image, self.spec.registry.as_deref());
        self.client
            .pull_image(&options)
            .await
            .map_err(|source| SwarmError::PullImage {
                image: self.image_name(),
                source,
            })
    }

    async fn create_service(&self, ctx: &Context) -> Result<String, SwarmError> {
        let descriptor = self.build_descriptor(&ctx.instance_name);
        self.client
            .create_service(&descriptor)
            .await
            .map_err(|source| SwarmError::CreateService {
                name: descriptor.name.clone(),
                image: descriptor.image.clone(),
                source,
            })
    }

    async fn watch_service(&self, ctx: &Context, service_id: &str) -> Result<(), JobError> {
        info!(
            parent: &ctx.span,
            service_id = %service_id,
            instance = %ctx.instance_name,
            "Checking for service termination"
        );

        let service = self
            .client
            .inspect_service(service_id)
            .await
            .map_err(|source| SwarmError::InspectService {
                id: service_id.to_string(),
                source,
            })?;

        let watcher = tokio::spawn(poll_service(
            Arc::clone(&self.client),
            service,
            self.watch.clone(),
            ctx.span.clone(),
        ));
        let _abort = AbortOnDrop(watcher.abort_handle());
        let outcome = watcher.await.map_err(|e| SwarmError::WatchTask {
            id: service_id.to_string(),
            message: e.to_string(),
        })?;

        info!(
            parent: &ctx.span,
            service_id = %service_id,
            instance = %ctx.instance_name,
            outcome = ?outcome,
            "Service has completed"
        );

        outcome.into_result()
    }

    async fn delete_service(&self, ctx: &Context, service_id: &str) -> Result<(), SwarmError> {
        if !self.spec.delete {
            return Ok(());
        }

        match self.client.remove_service(service_id).await {
            Ok(()) => Ok(()),
            Err(ClientError::NoSuchService(_)) => {
                warn!(
                    parent: &ctx.span,
                    service_id = %service_id,
                    "Service cannot be removed, it may have been removed by another process"
                );
                Ok(())
            }
            Err(source) => Err(SwarmError::RemoveService {
                id: service_id.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl Job for RunServiceJob {
    fn bare(&self) -> &BareJob {
        &self.bare
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), JobError> {
        self.pull_image().await?;

        let service_id = self.create_service(ctx).await?;
        info!(
            parent: &ctx.span,
            service_id = %service_id,
            instance = %ctx.instance_name,
            job = %self.name(),
            "Created service"
        );

        match self.watch_service(ctx, &service_id).await {
            Ok(()) => Ok(self.delete_service(ctx, &service_id).await?),
            Err(err) => {
                if let Err(cleanup) = self.delete_service(ctx, &service_id).await {
                    error!(
                        parent: &ctx.span,
                        image = %self.image_name(),
                        error = %cleanup,
                        "Error deleting service"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Stops the poller when the run is dropped before it joins it.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
