use clap::Parser;
use docker_deploy::{
    cli_docker::DockerCli,
    config::{
        CONTAINER_NAME_ENV_VAR_NAME, CONTAINER_RUNTIME_ENV_VAR_NAME, DEFAULT_CONTAINER_RUNTIME,
        DOCKER_IMAGE_ENV_VAR_NAME, PORT_MAPPING_ENV_VAR_NAME,
    },
    deploy, DeployConfig, DeployReport,
};
use stacked_errors::{Result, StackableErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pulls an image, stops and removes any existing container with the same
/// name, and runs a new detached container. Everything is configured through
/// `DOCKER_IMAGE`, `CONTAINER_NAME`, and `PORT_MAPPING`, the flags only
/// override them.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Image to deploy, overrides `DOCKER_IMAGE` (default "nginx:latest")
    #[arg(long)]
    image: Option<String>,
    /// Container name, overrides `CONTAINER_NAME` (default "my-nginx-app")
    #[arg(long)]
    name: Option<String>,
    /// `-p` port mapping, overrides `PORT_MAPPING` (default "80:80")
    #[arg(short, long, conflicts_with = "no_port")]
    port: Option<String>,
    /// Do not publish any port
    #[arg(long)]
    no_port: bool,
    /// Container runtime program
    #[arg(long, env = CONTAINER_RUNTIME_ENV_VAR_NAME, default_value = DEFAULT_CONTAINER_RUNTIME)]
    runtime: String,
    /// Use the Docker Engine API instead of the runtime program (needs the
    /// "bollard" feature)
    #[arg(long)]
    api: bool,
}

impl Args {
    /// Applies the overrides on top of `config`
    fn deploy_config(&self, mut config: DeployConfig) -> DeployConfig {
        if let Some(image) = &self.image {
            config.image.clone_from(image);
        }
        if let Some(name) = &self.name {
            config.container_name.clone_from(name);
        }
        if self.no_port {
            config.port_mapping = None;
        } else if let Some(port) = &self.port {
            config.port_mapping = Some(port.clone());
        }
        config
    }
}

#[cfg(feature = "bollard")]
async fn deploy_with_api(config: &DeployConfig) -> Result<DeployReport> {
    let runtime = docker_deploy::api_docker::ApiDocker::connect()
        .await
        .stack()?;
    deploy(&runtime, config).await
}

#[cfg(not(feature = "bollard"))]
async fn deploy_with_api(_config: &DeployConfig) -> Result<DeployReport> {
    stacked_errors::bail!("`--api` needs `docker_deploy` to be built with the \"bollard\" feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let config = args.deploy_config(DeployConfig::from_env());

    info!("Using {DOCKER_IMAGE_ENV_VAR_NAME}: {}", config.image);
    info!("Using {CONTAINER_NAME_ENV_VAR_NAME}: {}", config.container_name);
    info!(
        "Using {PORT_MAPPING_ENV_VAR_NAME}: {}",
        config.port_mapping.as_deref().unwrap_or("(none)")
    );

    // returning the error exits with code 1
    let report = if args.api {
        deploy_with_api(&config).await.stack()?
    } else {
        info!("Using container runtime: {}", args.runtime);
        deploy(&DockerCli::new(&args.runtime), &config).await.stack()?
    };
    info!(
        container.id = %report.container_id,
        replaced_existing = report.replaced_existing,
        "done"
    );
    Ok(())
}
