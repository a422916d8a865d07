mod client;
mod container;
mod ensure;
mod lifecycle;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{DockerClient, DockerConfig};
pub use ensure::ensure_runtime_available;
pub use lifecycle::{interrupt, ContainerSlot, LifecycleController};

use async_trait::async_trait;
use bollard::container::Config;
use bollard::errors::Error as DockerError;
use std::net::Ipv4Addr;

/// Combined stdout/stderr of an exec plus its exit code, when the engine reports one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub output: Vec<u8>,
    pub exit_code: Option<i64>,
}

/// The operations this tool needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the engine version.
    async fn ping(&self) -> Result<String, DockerError>;
    async fn image_exists(&self, image: &str) -> Result<bool, DockerError>;
    async fn pull_image(&self, image: &str) -> Result<(), DockerError>;
    async fn network_exists(&self, name: &str) -> Result<bool, DockerError>;
    async fn create_network(&self, name: &str, subnet: Option<String>) -> Result<(), DockerError>;
    async fn create_container(
        &self,
        name: Option<&str>,
        config: Config<String>,
    ) -> Result<String, DockerError>;
    async fn start_container(&self, id: &str) -> Result<(), DockerError>;
    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        ip: Option<Ipv4Addr>,
    ) -> Result<(), DockerError>;
    async fn exec(
        &self,
        container: &str,
        cmd: Vec<String>,
        env: Vec<String>,
    ) -> Result<ExecOutput, DockerError>;
    async fn kill_container(&self, id: &str) -> Result<(), DockerError>;
    async fn remove_container(&self, id: &str) -> Result<(), DockerError>;
}

pub(crate) fn is_not_found(error: &DockerError) -> bool {
    matches!(
        error,
        DockerError::DockerResponseServerError { status_code: 404, .. }
    )
}
