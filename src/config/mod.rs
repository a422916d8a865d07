mod assemble;
mod bind;
mod descriptor;
mod preset;

pub use assemble::{assemble, RunRequest, Settings};
pub use preset::{Profile, DOCKER_DEFAULTS, NOVNC, SIM_DEFAULTS, WASIM};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Rw,
    Ro,
}

impl BindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindMode::Rw => "rw",
            BindMode::Ro => "ro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeBind {
    pub host: PathBuf,
    pub container: String,
    pub mode: BindMode,
}

impl VolumeBind {
    /// Docker `Binds` entry: `host:container:mode`.
    pub fn to_bind(&self) -> String {
        format!("{}:{}:{}", self.host.display(), self.container, self.mode.as_str())
    }
}

impl fmt::Display for VolumeBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)?;
        if self.mode == BindMode::Ro {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAttachment {
    pub name: String,
    pub ip: Option<Ipv4Addr>,
}

/// Everything needed to launch one container. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchConfig {
    pub name: Option<String>,
    pub image: String,
    pub volumes: Vec<VolumeBind>,
    /// Container port -> host port.
    pub ports: BTreeMap<u16, u16>,
    pub network: Option<NetworkAttachment>,
    pub environment: Vec<String>,
    /// Executed inside the running container. `None` means the image's own
    /// entrypoint is the workload and the container is left running.
    pub command: Option<String>,
}

impl LaunchConfig {
    pub fn log_plan(&self) {
        let volumes: Vec<String> = self.volumes.iter().map(|v| v.to_string()).collect();
        let ports: Vec<String> = self
            .ports
            .iter()
            .map(|(container, host)| format!("{host}:{container}"))
            .collect();

        match &self.command {
            Some(command) => tracing::info!("Running '{}' with the following settings:", command),
            None => tracing::info!("Starting container with the following settings:"),
        }
        tracing::info!("\tName: {}", self.name.as_deref().unwrap_or("<generated>"));
        tracing::info!("\tImage: {}", self.image);
        tracing::info!("\tVolumes: {:?}", volumes);
        tracing::info!("\tPorts: {:?}", ports);
        match &self.network {
            Some(network) => {
                tracing::info!("\tNetwork: {}", network.name);
                tracing::info!(
                    "\tIP: {}",
                    network.ip.map(|ip| ip.to_string()).unwrap_or_else(|| "<dynamic>".to_string())
                );
            }
            None => tracing::info!("\tNetwork: <none>"),
        }
        tracing::info!("\tEnvironments: {:?}", self.environment);
    }
}
