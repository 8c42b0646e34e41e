//! See README.md for more

mod command;
mod command_runner;
mod deploy;
mod error;
#[cfg(test)]
mod mock;
mod parsing;

/// Container runtime backed by the Docker Engine API through [bollard], enabled
/// by the "bollard" feature.
#[cfg(feature = "bollard")]
pub mod api_docker;
/// Container runtime backed by the "docker" OS command (or a compatible one such
/// as "podman").
pub mod cli_docker;
pub mod config;
pub use command::*;
pub use command_runner::*;
pub use config::DeployConfig;
pub use deploy::*;
pub use error::*;
pub use parsing::*;
/// This reexport helps with dependency wrangling
pub use stacked_errors;
