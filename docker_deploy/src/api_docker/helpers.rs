use std::collections::HashMap;

use crate::PortBind;

pub mod docker_socket {
    use std::sync::{LazyLock, OnceLock};

    use stacked_errors::{Result, StackableErr};

    /// This acquires a process-wide unified `bollard::Docker` handle
    pub async fn get_or_init_default_docker_instance() -> Result<bollard::Docker> {
        static DOCKER_SOCKET: OnceLock<bollard::Docker> = OnceLock::new();
        static EXEC_LOCK: LazyLock<tokio::sync::Mutex<()>> = LazyLock::new(Default::default);

        // this has a fast path with a slow path that is careful to not block the
        // process
        if let Some(docker_instance) = DOCKER_SOCKET.get() {
            return Ok(docker_instance.clone())
        }
        let _exec_lock = EXEC_LOCK.lock().await;
        if let Some(docker_instance) = DOCKER_SOCKET.get() {
            return Ok(docker_instance.clone())
        }
        let docker_socket =
            tokio::task::spawn_blocking(|| bollard::Docker::connect_with_defaults().stack())
                .await
                .stack()?
                .stack_err("could not connect to the docker daemon")?;
        Ok(DOCKER_SOCKET.get_or_init(|| docker_socket).clone())
    }
}

/// Exposed ports and host port bindings in the form `create_container` takes
/// them
#[allow(clippy::type_complexity)]
pub(crate) fn port_bindings_to_bollard_args(
    pbs: &[PortBind],
) -> (
    Option<HashMap<String, HashMap<(), ()>>>,
    Option<HashMap<String, Option<Vec<bollard::secret::PortBinding>>>>,
) {
    if pbs.is_empty() {
        return (None, None)
    }
    let (exposed_ports, port_bindings) = pbs
        .iter()
        .map(|pb| {
            let key = pb.container_port_key();
            (
                (key.clone(), HashMap::new()),
                (
                    key,
                    Some(vec![bollard::secret::PortBinding {
                        // an empty host port makes the daemon choose one
                        host_port: Some(pb.host_port.map(|p| p.to_string()).unwrap_or_default()),
                        host_ip: pb.host_ip.as_ref().map(ToString::to_string),
                    }]),
                ),
            )
        })
        .unzip();
    (Some(exposed_ports), Some(port_bindings))
}
