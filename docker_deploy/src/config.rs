//! Deployment configuration resolved from environment variables

/// Name of the image to pull and run
pub const DOCKER_IMAGE_ENV_VAR_NAME: &str = "DOCKER_IMAGE";
/// Name given to the container
pub const CONTAINER_NAME_ENV_VAR_NAME: &str = "CONTAINER_NAME";
/// `-p` argument, e.x. "8080:80"
pub const PORT_MAPPING_ENV_VAR_NAME: &str = "PORT_MAPPING";
/// Program used as the container runtime CLI
pub const CONTAINER_RUNTIME_ENV_VAR_NAME: &str = "CONTAINER_RUNTIME";

pub const DEFAULT_DOCKER_IMAGE: &str = "nginx:latest";
pub const DEFAULT_CONTAINER_NAME: &str = "my-nginx-app";
pub const DEFAULT_PORT_MAPPING: &str = "80:80";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";

/// What to deploy. There is no validation of any of the fields, they are passed
/// on to the container runtime as they are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployConfig {
    /// Image in the format "name:tag" such as "nginx:latest"
    pub image: String,
    /// The name of the container that is replaced
    pub container_name: String,
    /// Passed as `-p <port_mapping>` when set
    pub port_mapping: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_DOCKER_IMAGE.to_owned(),
            container_name: DEFAULT_CONTAINER_NAME.to_owned(),
            port_mapping: Some(DEFAULT_PORT_MAPPING.to_owned()),
        }
    }
}

impl DeployConfig {
    /// Creates a configuration with no port mapping
    pub fn new(image: impl AsRef<str>, container_name: impl AsRef<str>) -> Self {
        Self {
            image: image.as_ref().to_owned(),
            container_name: container_name.as_ref().to_owned(),
            port_mapping: None,
        }
    }

    /// Sets `port_mapping`
    pub fn port_mapping<S: AsRef<str>>(mut self, port_mapping: Option<S>) -> Self {
        self.port_mapping = port_mapping.map(|s| s.as_ref().to_owned());
        self
    }

    /// Calls [DeployConfig::from_lookup] with the environment of the current
    /// process. Variables that are not valid unicode are treated as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration through `lookup`, which should return the
    /// value of the given variable name if it is set.
    ///
    /// Unset or empty `DOCKER_IMAGE` and `CONTAINER_NAME` fall back to their
    /// defaults. An unset `PORT_MAPPING` falls back to "80:80", but setting it
    /// to the empty string disables the port mapping.
    ///
    /// ```
    /// use docker_deploy::DeployConfig;
    ///
    /// let config = DeployConfig::from_lookup(|key| match key {
    ///     "DOCKER_IMAGE" => Some("redis:7".to_owned()),
    ///     "PORT_MAPPING" => Some(String::new()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.image, "redis:7");
    /// assert_eq!(config.container_name, "my-nginx-app");
    /// assert_eq!(config.port_mapping, None);
    /// ```
    pub fn from_lookup<F: FnMut(&str) -> Option<String>>(mut lookup: F) -> Self {
        let non_empty_or = |value: Option<String>, default: &str| match value {
            Some(value) if !value.is_empty() => value,
            _ => default.to_owned(),
        };
        let image = non_empty_or(lookup(DOCKER_IMAGE_ENV_VAR_NAME), DEFAULT_DOCKER_IMAGE);
        let container_name = non_empty_or(
            lookup(CONTAINER_NAME_ENV_VAR_NAME),
            DEFAULT_CONTAINER_NAME,
        );
        let port_mapping = match lookup(PORT_MAPPING_ENV_VAR_NAME) {
            None => Some(DEFAULT_PORT_MAPPING.to_owned()),
            Some(port_mapping) if port_mapping.is_empty() => None,
            Some(port_mapping) => Some(port_mapping),
        };
        Self {
            image,
            container_name,
            port_mapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(vars: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = DeployConfig::from_lookup(lookup_in(&[]));
        assert_eq!(config, DeployConfig::default());
        assert_eq!(config.image, "nginx:latest");
        assert_eq!(config.container_name, "my-nginx-app");
        assert_eq!(config.port_mapping.as_deref(), Some("80:80"));
    }

    #[test]
    fn set_values_are_used_verbatim() {
        let config = DeployConfig::from_lookup(lookup_in(&[
            ("DOCKER_IMAGE", "ghcr.io/acme/api:1.4.2"),
            ("CONTAINER_NAME", "api"),
            ("PORT_MAPPING", "127.0.0.1:8080:80"),
        ]));
        assert_eq!(
            config,
            DeployConfig::new("ghcr.io/acme/api:1.4.2", "api")
                .port_mapping(Some("127.0.0.1:8080:80"))
        );
    }

    #[test]
    fn empty_values() {
        let config = DeployConfig::from_lookup(lookup_in(&[
            ("DOCKER_IMAGE", ""),
            ("CONTAINER_NAME", ""),
            ("PORT_MAPPING", ""),
        ]));
        assert_eq!(config.image, DEFAULT_DOCKER_IMAGE);
        assert_eq!(config.container_name, DEFAULT_CONTAINER_NAME);
        assert_eq!(config.port_mapping, None);
    }
}
