use std::collections::HashMap;

use bollard::{
    container::{
        Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
        StopContainerOptions,
    },
    image::CreateImageOptions,
};
use futures::TryStreamExt;
use stacked_errors::{Result, StackableErr};
use tracing::debug;

use crate::{
    api_docker::{docker_socket::get_or_init_default_docker_instance, port_bindings_to_bollard_args},
    split_image_reference, ContainerRuntime, DeployConfig, PortBind,
};

/// A [ContainerRuntime] talking to the Docker Engine API through [bollard]
/// instead of calling the "docker" OS command
#[derive(Debug, Clone)]
pub struct ApiDocker {
    docker: bollard::Docker,
}

impl ApiDocker {
    /// Connects with the default socket configuration (respecting
    /// `DOCKER_HOST`). The connection is shared process-wide.
    pub async fn connect() -> Result<Self> {
        let docker = get_or_init_default_docker_instance().await.stack()?;
        Ok(Self { docker })
    }
}

impl ContainerRuntime for ApiDocker {
    async fn pull(&self, image: &str) -> Result<()> {
        let (repository, tag) = split_image_reference(image);
        let infos: Vec<_> = self
            .docker
            .create_image(
                Some(CreateImageOptions {
                    from_image: repository.to_owned(),
                    tag: tag.to_owned(),
                    ..Default::default()
                }),
                None,
                None,
            )
            .try_collect()
            .await
            .stack_err_with(|| format!("ApiDocker::pull(image: {image})"))?;
        if let Some(last) = infos.last() {
            debug!(status = ?last.status, "pulled {image}");
        }
        Ok(())
    }

    async fn find_container(&self, container_name: &str) -> Result<bool> {
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                filters: HashMap::from([("name".to_owned(), vec![container_name.to_owned()])]),
                ..Default::default()
            }))
            .await
            .stack_err_with(|| {
                format!("ApiDocker::find_container(container_name: {container_name})")
            })?;
        // the API reports names with a leading slash
        Ok(summaries
            .iter()
            .filter_map(|summary| summary.names.as_ref())
            .flatten()
            .any(|name| name.trim_start_matches('/') == container_name))
    }

    async fn stop(&self, container_name: &str) -> Result<()> {
        self.docker
            .stop_container(container_name, None::<StopContainerOptions>)
            .await
            .stack_err_with(|| format!("ApiDocker::stop(container_name: {container_name})"))
    }

    async fn remove(&self, container_name: &str) -> Result<()> {
        self.docker
            .remove_container(container_name, None::<RemoveContainerOptions>)
            .await
            .stack_err_with(|| format!("ApiDocker::remove(container_name: {container_name})"))
    }

    async fn run_detached(&self, config: &DeployConfig) -> Result<String> {
        let port_bindings: Vec<PortBind> = match &config.port_mapping {
            Some(port_mapping) => vec![port_mapping
                .parse()
                .stack_err("ApiDocker::run_detached -> invalid port mapping")?],
            None => vec![],
        };
        let (exposed_ports, port_bindings) = port_bindings_to_bollard_args(&port_bindings);
        let name = &config.container_name;
        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    ..Default::default()
                }),
                Config {
                    image: Some(config.image.clone()),
                    exposed_ports,
                    host_config: Some(bollard::secret::HostConfig {
                        port_bindings,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .stack_err_with(|| format!("ApiDocker::run_detached -> failed to create {name}"))?;
        for warning in &response.warnings {
            tracing::warn!("docker daemon: {warning}");
        }
        self.docker
            .start_container::<String>(name, None)
            .await
            .stack_err_with(|| format!("ApiDocker::run_detached -> failed to start {name}"))?;
        Ok(response.id)
    }
}
