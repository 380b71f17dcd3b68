//! Service descriptor submitted to the cluster.

use std::collections::HashMap;

/// Specification of a one-shot service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service name, the run's instance name.
    pub name: String,

    /// Fully qualified image reference.
    pub image: String,

    /// Command override, tokenized.
    pub command: Option<Vec<String>>,

    pub restart_policy: RestartPolicy,

    /// Network to attach so the task can reach other services of a stack.
    pub network: Option<String>,

    pub log_driver: Option<LogDriver>,

    pub placement_constraints: Vec<String>,
}

impl ServiceDescriptor {
    /// Descriptor for `image` named `name`, with the one-shot restart policy.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: None,
            restart_policy: RestartPolicy::one_shot(),
            network: None,
            log_driver: None,
            placement_constraints: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        if !command.is_empty() {
            self.command = Some(command);
        }
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_log_driver(mut self, driver: LogDriver) -> Self {
        self.log_driver = Some(driver);
        self
    }

    pub fn with_placement_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.placement_constraints.push(constraint.into());
        self
    }
}

/// When the cluster restarts a service task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCondition {
    None,
    OnFailure,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub condition: RestartCondition,
    pub max_attempts: u64,
}

impl RestartPolicy {
    /// Never restart, at most one attempt: the service runs its task once.
    pub fn one_shot() -> Self {
        Self {
            condition: RestartCondition::None,
            max_attempts: 1,
        }
    }
}

/// Logging driver for the service task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDriver {
    pub name: String,
    pub options: HashMap<String, String>,
}

impl LogDriver {
    /// GELF driver shipping to `address`.
    pub fn gelf(address: impl Into<String>) -> Self {
        let mut options = HashMap::new();
        options.insert("gelf-address".to_string(), address.into());
        Self {
            name: "gelf".to_string(),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_descriptor_is_one_shot() {
        let descriptor = ServiceDescriptor::new("job_1", "alpine:3");
        assert_eq!(descriptor.restart_policy.condition, RestartCondition::None);
        assert_eq!(descriptor.restart_policy.max_attempts, 1);
        assert!(descriptor.command.is_none());
        assert!(descriptor.network.is_none());
    }

    #[test]
    fn test_empty_command_keeps_image_default() {
        let descriptor = ServiceDescriptor::new("job_1", "alpine:3").with_command(Vec::new());
        assert!(descriptor.command.is_none());
    }

    #[test]
    fn test_gelf_driver() {
        let driver = LogDriver::gelf("udp://graylog:12201");
        assert_eq!(driver.name, "gelf");
        assert_eq!(
            driver.options.get("gelf-address").map(String::as_str),
            Some("udp://graylog:12201")
        );
    }
}
