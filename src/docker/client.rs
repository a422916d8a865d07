use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{EndpointIpamConfig, EndpointSettings, Ipam, IpamConfig};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions, ListNetworksOptions};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tracing::{debug, info};

use super::{is_not_found, ContainerRuntime, ExecOutput};
use crate::error::{LaunchError, Result};

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub socket_path: Option<String>,
    pub timeout: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: None, // DOCKER_HOST or the platform default socket
            timeout: 120,
        }
    }
}

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Builds a client for the configured socket. Nothing is sent to the
    /// engine until the first call; see [`ensure_runtime_available`](super::ensure_runtime_available).
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = match &config.socket_path {
            Some(socket) => Docker::connect_with_socket(socket, config.timeout, &API_DEFAULT_VERSION),
            None => Docker::connect_with_defaults(),
        }
        .map_err(|e| LaunchError::MissingDependency(format!("cannot connect to Docker: {e}")))?;

        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> std::result::Result<String, DockerError> {
        let version = self.docker.version().await?;
        Ok(version.version.unwrap_or_default())
    }

    async fn image_exists(&self, image: &str) -> std::result::Result<bool, DockerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pull_image(&self, image: &str) -> std::result::Result<(), DockerError> {
        info!("Pulling Docker image: {}", image);

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(info) = stream.next().await {
            if let Some(status) = info?.status {
                debug!("Pull status: {}", status);
            }
        }

        Ok(())
    }

    async fn network_exists(&self, name: &str) -> std::result::Result<bool, DockerError> {
        // The name filter matches substrings, so compare exactly afterwards.
        let options = ListNetworksOptions {
            filters: HashMap::from([("name".to_string(), vec![name.to_string()])]),
        };

        let networks = self.docker.list_networks(Some(options)).await?;
        Ok(networks.iter().any(|n| n.name.as_deref() == Some(name)))
    }

    async fn create_network(
        &self,
        name: &str,
        subnet: Option<String>,
    ) -> std::result::Result<(), DockerError> {
        let ipam = match subnet {
            Some(subnet) => Ipam {
                config: Some(vec![IpamConfig {
                    subnet: Some(subnet),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            None => Ipam::default(),
        };

        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: "bridge".to_string(),
            ipam,
            ..Default::default()
        };

        self.docker.create_network(options).await?;
        Ok(())
    }

    async fn create_container(
        &self,
        name: Option<&str>,
        config: Config<String>,
    ) -> std::result::Result<String, DockerError> {
        let options = name.map(|name| CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        });

        let response = self.docker.create_container(options, config).await?;
        info!("Created container {} with ID: {}", name.unwrap_or("<generated>"), response.id);
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> std::result::Result<(), DockerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;

        info!("Started container: {}", id);
        Ok(())
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        ip: Option<Ipv4Addr>,
    ) -> std::result::Result<(), DockerError> {
        let options = ConnectNetworkOptions {
            container: container.to_string(),
            endpoint_config: EndpointSettings {
                ipam_config: ip.map(|ip| EndpointIpamConfig {
                    ipv4_address: Some(ip.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };

        self.docker.connect_network(network, options).await
    }

    async fn exec(
        &self,
        container: &str,
        cmd: Vec<String>,
        env: Vec<String>,
    ) -> std::result::Result<ExecOutput, DockerError> {
        let exec_config = CreateExecOptions {
            cmd: Some(cmd),
            env: (!env.is_empty()).then_some(env),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self.docker.create_exec(container, exec_config).await?;

        let mut output = Vec::new();
        if let StartExecResults::Attached { output: mut stream, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(msg) = stream.next().await {
                output.extend_from_slice(&msg?.into_bytes());
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutput {
            output,
            exit_code: inspect.exit_code,
        })
    }

    async fn kill_container(&self, id: &str) -> std::result::Result<(), DockerError> {
        self.docker
            .kill_container(id, None::<KillContainerOptions<String>>)
            .await?;

        info!("Killed container: {}", id);
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> std::result::Result<(), DockerError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker.remove_container(id, Some(options)).await?;

        info!("Removed container: {}", id);
        Ok(())
    }
}
