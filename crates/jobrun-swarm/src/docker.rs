//! [`SwarmClient`] backed by a Docker daemon through bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::errors::Error as DockerError;
use bollard::models::{
    NetworkAttachmentConfig, ServiceSpec, TaskSpec, TaskSpecContainerSpec, TaskSpecLogDriver,
    TaskSpecPlacement, TaskSpecRestartPolicy, TaskSpecRestartPolicyConditionEnum,
};
use bollard::query_parameters::{CreateImageOptionsBuilder, InspectServiceOptions, ListTasksOptions};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use tracing::debug;

use crate::{
    ClientError, PullOptions, RestartCondition, ServiceDescriptor, ServiceInfo, SwarmClient,
    TaskState, TaskStatus,
};

/// Swarm manager reached over the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerSwarm {
    docker: Docker,
}

impl DockerSwarm {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self, ClientError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl SwarmClient for DockerSwarm {
    async fn pull_image(&self, options: &PullOptions) -> Result<(), ClientError> {
        debug!(image = %options.reference(), "Pulling image");

        let create = CreateImageOptionsBuilder::default()
            .from_image(&options.repository)
            .tag(&options.tag)
            .build();
        self.docker
            .create_image(Some(create), None, pull_credentials(options))
            .try_collect::<Vec<_>>()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn create_service(&self, descriptor: &ServiceDescriptor) -> Result<String, ClientError> {
        let response = self
            .docker
            .create_service(to_service_spec(descriptor), None)
            .await
            .map_err(api_error)?;

        response
            .id
            .ok_or_else(|| ClientError::Api("service created without an id".to_string()))
    }

    async fn inspect_service(&self, id: &str) -> Result<ServiceInfo, ClientError> {
        let service = self
            .docker
            .inspect_service(id, None::<InspectServiceOptions>)
            .await
            .map_err(|e| service_error(id, e))?;

        let created_at = service
            .created_at
            .as_deref()
            .ok_or_else(|| ClientError::Api(format!("service {} has no creation time", id)))
            .and_then(parse_timestamp)?;

        Ok(ServiceInfo {
            id: service.id.unwrap_or_else(|| id.to_string()),
            name: service.spec.and_then(|spec| spec.name).unwrap_or_default(),
            created_at,
        })
    }

    async fn list_tasks(&self, service_id: &str) -> Result<Vec<TaskStatus>, ClientError> {
        let mut filters = HashMap::new();
        filters.insert("service".to_string(), vec![service_id.to_string()]);

        let tasks = self
            .docker
            .list_tasks(Some(ListTasksOptions {
                filters: Some(filters),
            }))
            .await
            .map_err(api_error)?;

        Ok(tasks
            .into_iter()
            .map(|task| {
                let status = task.status.unwrap_or_default();
                let state = status
                    .state
                    .map(|state| TaskState::from_api(&state.to_string()))
                    .unwrap_or(TaskState::Unknown);
                let exit_code = status.container_status.and_then(|c| c.exit_code);
                TaskStatus::new(state, exit_code)
            })
            .collect())
    }

    async fn remove_service(&self, id: &str) -> Result<(), ClientError> {
        self.docker
            .delete_service(id)
            .await
            .map_err(|e| service_error(id, e))
    }
}

/// Translate a descriptor into the Engine API service specification.
fn to_service_spec(descriptor: &ServiceDescriptor) -> ServiceSpec {
    let restart_policy = TaskSpecRestartPolicy {
        condition: Some(match descriptor.restart_policy.condition {
            RestartCondition::None => TaskSpecRestartPolicyConditionEnum::NONE,
            RestartCondition::OnFailure => TaskSpecRestartPolicyConditionEnum::ON_FAILURE,
            RestartCondition::Any => TaskSpecRestartPolicyConditionEnum::ANY,
        }),
        max_attempts: i64::try_from(descriptor.restart_policy.max_attempts).ok(),
        ..Default::default()
    };

    let placement = (!descriptor.placement_constraints.is_empty()).then(|| TaskSpecPlacement {
        constraints: Some(descriptor.placement_constraints.clone()),
        ..Default::default()
    });

    let log_driver = descriptor.log_driver.as_ref().map(|driver| TaskSpecLogDriver {
        name: Some(driver.name.clone()),
        options: Some(driver.options.clone()),
    });

    let networks = descriptor.network.as_ref().map(|network| {
        vec![NetworkAttachmentConfig {
            target: Some(network.clone()),
            ..Default::default()
        }]
    });

    ServiceSpec {
        name: Some(descriptor.name.clone()),
        task_template: Some(TaskSpec {
            container_spec: Some(TaskSpecContainerSpec {
                image: Some(descriptor.image.clone()),
                command: descriptor.command.clone(),
                ..Default::default()
            }),
            restart_policy: Some(restart_policy),
            placement,
            log_driver,
            networks,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Credentials scoped to the image's registry, resolved by the daemon.
fn pull_credentials(options: &PullOptions) -> Option<DockerCredentials> {
    options.registry.as_ref().map(|registry| DockerCredentials {
        serveraddress: Some(registry.clone()),
        ..Default::default()
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ClientError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ClientError::Api(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn service_error(id: &str, err: DockerError) -> ClientError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => ClientError::NoSuchService(id.to_string()),
        other => api_error(other),
    }
}

fn api_error(err: DockerError) -> ClientError {
    ClientError::Api(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogDriver;

    #[test]
    fn test_service_spec_is_one_shot() {
        let descriptor = ServiceDescriptor::new("backup_1700000000", "alpine:3")
            .with_command(vec!["echo".to_string(), "hi".to_string()]);

        let spec = to_service_spec(&descriptor);
        assert_eq!(spec.name.as_deref(), Some("backup_1700000000"));

        let template = spec.task_template.unwrap();
        let container = template.container_spec.unwrap();
        assert_eq!(container.image.as_deref(), Some("alpine:3"));
        assert_eq!(
            container.command,
            Some(vec!["echo".to_string(), "hi".to_string()])
        );

        let restart = template.restart_policy.unwrap();
        assert_eq!(
            restart.condition,
            Some(TaskSpecRestartPolicyConditionEnum::NONE)
        );
        assert_eq!(restart.max_attempts, Some(1));

        assert!(template.networks.is_none());
        assert!(template.log_driver.is_none());
        assert!(template.placement.is_none());
    }

    #[test]
    fn test_service_spec_optional_settings() {
        let descriptor = ServiceDescriptor::new("backup_1", "alpine:3")
            .with_network("backend")
            .with_log_driver(LogDriver::gelf("udp://graylog:12201"))
            .with_placement_constraint("node.role == worker");

        let template = to_service_spec(&descriptor).task_template.unwrap();

        let networks = template.networks.unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].target.as_deref(), Some("backend"));

        let driver = template.log_driver.unwrap();
        assert_eq!(driver.name.as_deref(), Some("gelf"));
        assert_eq!(
            driver.options.unwrap().get("gelf-address").map(String::as_str),
            Some("udp://graylog:12201")
        );

        assert_eq!(
            template.placement.unwrap().constraints,
            Some(vec!["node.role == worker".to_string()])
        );
    }

    #[test]
    fn test_pull_credentials_target_registry() {
        let private = PullOptions::parse("srcd/rest:qux", Some("registry.local:5000"));
        let credentials = pull_credentials(&private).unwrap();
        assert_eq!(
            credentials.serveraddress.as_deref(),
            Some("registry.local:5000")
        );
        assert!(credentials.username.is_none());

        assert!(pull_credentials(&PullOptions::parse("alpine:3", None)).is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-05-01T10:20:30.123456789Z").unwrap();
        assert_eq!(parsed.timestamp(), 1_714_558_830);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_not_found_maps_to_no_such_service() {
        let err = service_error(
            "svc-1",
            DockerError::DockerResponseServerError {
                status_code: 404,
                message: "service svc-1 not found".to_string(),
            },
        );
        assert!(matches!(err, ClientError::NoSuchService(id) if id == "svc-1"));

        let err = service_error(
            "svc-1",
            DockerError::DockerResponseServerError {
                status_code: 500,
                message: "boom".to_string(),
            },
        );
        assert!(matches!(err, ClientError::Api(_)));
    }
}
