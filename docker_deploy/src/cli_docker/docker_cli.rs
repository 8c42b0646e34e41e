use stacked_errors::{Result, StackableErr};
use tracing::{debug, warn};

use crate::{
    Command, CommandExecutor, CommandResult, ContainerRuntime, DeployConfig, SystemExecutor,
};

/// A [ContainerRuntime] that calls the "docker" OS command, or any other
/// program with a compatible `pull`, `ps`, `stop`, `rm`, and `run` interface
/// (e.x. "podman").
#[derive(Debug, Clone)]
pub struct DockerCli<E = SystemExecutor> {
    /// The runtime program, "docker" by default
    pub program: String,
    pub executor: E,
}

impl DockerCli {
    /// Uses `program` as the runtime, running commands as OS processes
    pub fn new(program: impl AsRef<str>) -> Self {
        Self::with_executor(program, SystemExecutor)
    }
}

impl<E: CommandExecutor> DockerCli<E> {
    pub fn with_executor(program: impl AsRef<str>, executor: E) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            executor,
        }
    }

    fn command(&self) -> Command {
        Command::new_os_str(&self.program)
    }

    /// Executes `command` and returns the result if it was successful
    async fn execute_successfully(&self, command: Command) -> Result<CommandResult> {
        let comres = self.executor.execute(command).await?;
        comres.assert_success()?;
        Ok(comres)
    }

    /// Returns the arguments of `docker run` for `config`, the program itself is
    /// not included
    pub fn run_args(config: &DeployConfig) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "-d".to_owned(),
            "--name".to_owned(),
            config.container_name.clone(),
        ];
        if let Some(port_mapping) = &config.port_mapping {
            args.push("-p".to_owned());
            args.push(port_mapping.clone());
        }
        args.push(config.image.clone());
        args
    }
}

impl<E: CommandExecutor> ContainerRuntime for DockerCli<E> {
    async fn pull(&self, image: &str) -> Result<()> {
        self.execute_successfully(self.command().args(["pull", image]).debug(true))
            .await
            .stack_err_with(|| format!("DockerCli::pull(image: {image})"))
            .map(drop)
    }

    async fn find_container(&self, container_name: &str) -> Result<bool> {
        // the name filter matches substrings, so the exact name has to be looked for in
        // the output
        let filter = format!("name={container_name}");
        let comres = self
            .execute_successfully(self.command().args([
                "ps",
                "-a",
                "--filter",
                filter.as_str(),
                "--format",
                "{{.Names}}",
            ]))
            .await
            .stack_err_with(|| {
                format!("DockerCli::find_container(container_name: {container_name})")
            })?;
        let stdout = comres.stdout_as_utf8().stack()?;
        debug!(names = ?stdout.trim(), "containers matching the name filter");
        Ok(stdout.lines().any(|line| line.trim() == container_name))
    }

    async fn stop(&self, container_name: &str) -> Result<()> {
        self.execute_successfully(self.command().args(["stop", container_name]).debug(true))
            .await
            .stack_err_with(|| format!("DockerCli::stop(container_name: {container_name})"))
            .map(drop)
    }

    async fn remove(&self, container_name: &str) -> Result<()> {
        self.execute_successfully(self.command().args(["rm", container_name]).debug(true))
            .await
            .stack_err_with(|| format!("DockerCli::remove(container_name: {container_name})"))
            .map(drop)
    }

    async fn run_detached(&self, config: &DeployConfig) -> Result<String> {
        let comres = self
            .execute_successfully(self.command().args(Self::run_args(config)).debug(true))
            .await
            .stack_err_with(|| format!("DockerCli::run_detached(config: {config:?})"))?;
        // `docker run -d` prints the full id of the new container, the container is
        // running either way once the command succeeded
        let stdout = comres.stdout_as_utf8_lossy();
        let id = stdout.trim().lines().last().unwrap_or_default().trim();
        if id.is_empty() {
            warn!(
                "`{}` succeeded but did not print a container id",
                comres.command.get_unified_command()
            );
        }
        Ok(id.to_owned())
    }
}
