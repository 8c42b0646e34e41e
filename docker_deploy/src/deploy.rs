use std::future::Future;

use stacked_errors::{Result, StackableErr};
use tracing::{info, warn};

use crate::DeployConfig;

/// The operations of a container runtime that a deployment needs. See
/// [DockerCli](crate::cli_docker::DockerCli) for the implementation that shells
/// out to the `docker` command.
pub trait ContainerRuntime {
    /// Pulls `image` from its registry
    fn pull(&self, image: &str) -> impl Future<Output = Result<()>>;

    /// Returns if a container (running or not) named exactly `container_name`
    /// exists
    fn find_container(&self, container_name: &str) -> impl Future<Output = Result<bool>>;

    /// Stops the container named `container_name`
    fn stop(&self, container_name: &str) -> impl Future<Output = Result<()>>;

    /// Removes the container named `container_name`
    fn remove(&self, container_name: &str) -> impl Future<Output = Result<()>>;

    /// Creates and starts a detached container according to `config`, returning
    /// the container id
    fn run_detached(&self, config: &DeployConfig) -> impl Future<Output = Result<String>>;
}

/// What a successful [deploy] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Id of the new container as reported by the runtime
    pub container_id: String,
    /// If a previous container with the same name was stopped and removed
    pub replaced_existing: bool,
}

/// Deploys or updates a container: pulls `config.image`, stops and removes any
/// existing container named `config.container_name`, and runs a new detached
/// container.
///
/// Any failure of the pull, stop, remove, or run steps is returned. A failure
/// to check for an existing container is only logged as a warning, in which
/// case the run is attempted anyway.
#[tracing::instrument(skip_all,
    fields(
        image = %config.image,
        container.name = %config.container_name,
    )
)]
pub async fn deploy<R: ContainerRuntime>(
    runtime: &R,
    config: &DeployConfig,
) -> Result<DeployReport> {
    let image = &config.image;
    let name = &config.container_name;
    info!("--- Starting container deployment ---");

    info!("Pulling image {image}");
    runtime
        .pull(image)
        .await
        .stack_err_with(|| format!("deploy -> failed to pull image {image}"))?;

    info!("Checking for existing container {name}");
    let replaced_existing = match runtime.find_container(name).await {
        Ok(true) => {
            info!("Existing container {name} found, stopping and removing");
            runtime
                .stop(name)
                .await
                .stack_err_with(|| format!("deploy -> failed to stop container {name}"))?;
            runtime
                .remove(name)
                .await
                .stack_err_with(|| format!("deploy -> failed to remove container {name}"))?;
            true
        }
        Ok(false) => {
            info!("No existing container {name} found, proceeding to run");
            false
        }
        Err(e) => {
            // running will still create the container if it does not exist
            warn!("Could not check for existing container {name}: {e}");
            false
        }
    };

    info!("Running new container {name} from image {image}");
    let container_id = runtime
        .run_detached(config)
        .await
        .stack_err_with(|| format!("deploy -> failed to run container {name}"))?;

    info!(container.id = %container_id, "Successfully deployed container {name}");
    info!("--- Container deployment complete ---");
    Ok(DeployReport {
        container_id,
        replaced_existing,
    })
}

#[cfg(test)]
mod tests {
    use stacked_errors::{ensure, ensure_eq};

    use super::*;
    use crate::{cli_docker::DockerCli, mock::MockExecutor};

    const PULL: &str = "docker pull nginx:latest";
    const PS: &str = "docker ps -a --filter name=my-nginx-app --format {{.Names}}";
    const STOP: &str = "docker stop my-nginx-app";
    const RM: &str = "docker rm my-nginx-app";
    const RUN: &str = "docker run -d --name my-nginx-app -p 80:80 nginx:latest";
    const ID: &str = "5f1c2a9e0d7b";

    fn runtime(executor: MockExecutor) -> DockerCli<MockExecutor> {
        DockerCli::with_executor("docker", executor.respond("docker run", 0, &format!("{ID}\n")))
    }

    #[tokio::test]
    async fn fresh_deploy_skips_stop_and_remove() -> Result<()> {
        let rt = runtime(MockExecutor::new());
        let report = deploy(&rt, &DeployConfig::default()).await.stack()?;
        ensure_eq!(rt.executor.issued(), vec![PULL, PS, RUN]);
        ensure_eq!(report, DeployReport {
            container_id: ID.to_owned(),
            replaced_existing: false
        });
        Ok(())
    }

    #[tokio::test]
    async fn existing_container_is_replaced() -> Result<()> {
        let rt = runtime(MockExecutor::new().respond("docker ps", 0, "my-nginx-app\n"));
        let report = deploy(&rt, &DeployConfig::default()).await.stack()?;
        ensure_eq!(rt.executor.issued(), vec![PULL, PS, STOP, RM, RUN]);
        ensure!(report.replaced_existing);
        Ok(())
    }

    #[tokio::test]
    async fn similarly_named_containers_are_left_alone() -> Result<()> {
        let rt = runtime(MockExecutor::new().respond(
            "docker ps",
            0,
            "my-nginx-app-old\nstaging-my-nginx-app\n",
        ));
        let report = deploy(&rt, &DeployConfig::default()).await.stack()?;
        ensure_eq!(rt.executor.issued(), vec![PULL, PS, RUN]);
        ensure!(!report.replaced_existing);
        Ok(())
    }

    #[tokio::test]
    async fn failed_query_is_not_fatal() -> Result<()> {
        let rt = runtime(MockExecutor::new().respond("docker ps", 1, ""));
        let report = deploy(&rt, &DeployConfig::default()).await.stack()?;
        ensure_eq!(rt.executor.issued(), vec![PULL, PS, RUN]);
        ensure!(!report.replaced_existing);
        Ok(())
    }

    #[tokio::test]
    async fn failed_pull_aborts() {
        let rt = runtime(MockExecutor::new().respond("docker pull", 1, ""));
        let e = deploy(&rt, &DeployConfig::default()).await.unwrap_err();
        assert_eq!(rt.executor.issued(), vec![PULL]);
        let s = format!("{e:?}");
        assert!(s.contains("failed to pull image nginx:latest"), "{s}");
        assert!(s.contains("mock failure of `docker pull nginx:latest`"), "{s}");
    }

    #[tokio::test]
    async fn failed_stop_or_remove_aborts() {
        let rt = runtime(
            MockExecutor::new()
                .respond("docker ps", 0, "my-nginx-app\n")
                .respond("docker stop", 1, ""),
        );
        let e = deploy(&rt, &DeployConfig::default()).await.unwrap_err();
        assert_eq!(rt.executor.issued(), vec![PULL, PS, STOP]);
        assert!(format!("{e:?}").contains("failed to stop container my-nginx-app"));

        let rt = runtime(
            MockExecutor::new()
                .respond("docker ps", 0, "my-nginx-app\n")
                .respond("docker rm", 1, ""),
        );
        let e = deploy(&rt, &DeployConfig::default()).await.unwrap_err();
        assert_eq!(rt.executor.issued(), vec![PULL, PS, STOP, RM]);
        assert!(format!("{e:?}").contains("failed to remove container my-nginx-app"));
    }

    #[tokio::test]
    async fn failed_run_aborts() {
        let rt = DockerCli::with_executor(
            "docker",
            MockExecutor::new().respond("docker run", 125, ""),
        );
        let e = deploy(&rt, &DeployConfig::default()).await.unwrap_err();
        assert_eq!(rt.executor.issued(), vec![PULL, PS, RUN]);
        let s = format!("{e:?}");
        assert!(s.contains("failed to run container my-nginx-app"), "{s}");
        assert!(s.contains("exit code 125"), "{s}");
    }

    #[tokio::test]
    async fn custom_config_without_port_mapping() -> Result<()> {
        let rt = runtime(MockExecutor::new());
        let config = DeployConfig::new("redis:7", "cache");
        deploy(&rt, &config).await.stack()?;
        ensure_eq!(rt.executor.issued(), vec![
            "docker pull redis:7",
            "docker ps -a --filter name=cache --format {{.Names}}",
            "docker run -d --name cache redis:7",
        ]);
        Ok(())
    }
}
