use bollard::container::Config;
use bollard::models::{HostConfig, PortBinding};
use std::collections::HashMap;

use crate::config::LaunchConfig;

/// What the container runs as its foreground process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerMode {
    /// An interactive shell that keeps the container alive for later execs.
    /// The environment is applied to the exec, not the container.
    Shell,
    /// The image's own entrypoint, with the environment applied to the container.
    Service,
}

pub fn container_config(config: &LaunchConfig, mode: ContainerMode) -> Config<String> {
    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for (container, host) in &config.ports {
        let key = format!("{container}/tcp");
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(host.to_string()),
            }]),
        );
    }

    let host_config = HostConfig {
        binds: Some(config.volumes.iter().map(|v| v.to_bind()).collect()),
        port_bindings: Some(port_bindings),
        auto_remove: Some(true),
        ..Default::default()
    };

    let mut container = Config {
        image: Some(config.image.clone()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    };

    match mode {
        ContainerMode::Shell => {
            container.cmd = Some(vec!["/bin/bash".to_string()]);
            container.tty = Some(true);
            container.open_stdin = Some(true);
        }
        ContainerMode::Service => {
            if !config.environment.is_empty() {
                container.env = Some(config.environment.clone());
            }
        }
    }

    container
}
