// Container-published ports via bollard

mod ports;

use crate::error::{MonitorError, MonitorResult};
use crate::models::ContainerPort;
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::ListContainersOptions;
use std::collections::HashMap;
use tracing::instrument;

#[async_trait]
pub trait ContainerPortSource: Send + Sync {
    /// Host ports published by running containers. A missing runtime may surface as an error;
    /// the port merger treats any error here as "no containers".
    async fn list_container_ports(&self) -> MonitorResult<Vec<ContainerPort>>;
}

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerPortSource for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "list_container_ports"))]
    async fn list_container_ports(&self) -> MonitorResult<Vec<ContainerPort>> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let filter = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(filter))
            .await
            .map_err(|e| MonitorError::ProbeUnavailable(format!("docker: {e}")))?;

        Ok(containers.iter().flat_map(ports::published_ports).collect())
    }
}

/// Stand-in used when no Docker client could be created at startup.
pub struct NoContainerRuntime;

#[async_trait]
impl ContainerPortSource for NoContainerRuntime {
    async fn list_container_ports(&self) -> MonitorResult<Vec<ContainerPort>> {
        Ok(Vec::new())
    }
}
