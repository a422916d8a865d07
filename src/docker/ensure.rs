use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

use super::ContainerRuntime;
use crate::error::{LaunchError, Result};

/// Fails with [`LaunchError::MissingDependency`] unless the engine answers.
pub async fn ensure_runtime_available(runtime: &dyn ContainerRuntime) -> Result<()> {
    let version = runtime.ping().await.map_err(|e| {
        LaunchError::MissingDependency(format!(
            "Docker Engine is not reachable ({e}); is Docker installed and running?"
        ))
    })?;
    info!("Connected to Docker daemon version: {}", version);
    Ok(())
}

/// Pulls `image` unless it is already present locally.
pub async fn ensure_image(runtime: &dyn ContainerRuntime, image: &str) -> Result<()> {
    let present = runtime
        .image_exists(image)
        .await
        .map_err(LaunchError::runtime("inspect image"))?;
    if present {
        debug!("Image {} found locally", image);
        return Ok(());
    }

    warn!("{} was not found locally. Pulling from the registry. This may take a few minutes...", image);
    runtime
        .pull_image(image)
        .await
        .map_err(|source| LaunchError::ImagePull {
            image: image.to_string(),
            source,
        })?;
    info!("Finished pulling {}", image);

    Ok(())
}

/// The /24 that contains `ip`, e.g. `172.20.0.3` -> `172.20.0.0/24`.
pub fn subnet_for(ip: Ipv4Addr) -> String {
    let network = Ipv4Addr::from(u32::from(ip) & 0xFFFF_FF00);
    format!("{network}/24")
}

/// Creates the bridge network `name` unless it exists. With an `ip` the
/// network gets the /24 subnet containing it, otherwise the engine picks one.
pub async fn ensure_network(
    runtime: &dyn ContainerRuntime,
    name: &str,
    ip: Option<Ipv4Addr>,
) -> Result<()> {
    let present = runtime
        .network_exists(name)
        .await
        .map_err(LaunchError::runtime("inspect networks"))?;
    if present {
        debug!("Network {} already exists", name);
        return Ok(());
    }

    warn!("{} has not been created yet. Creating it...", name);
    let subnet = ip.map(subnet_for);
    match &subnet {
        Some(subnet) => info!("Creating network with name '{}' with subnet '{}'.", name, subnet),
        None => info!("Creating network with name '{}'.", name),
    }

    runtime
        .create_network(name, subnet)
        .await
        .map_err(|source| LaunchError::NetworkCreate {
            network: name.to_string(),
            source,
        })
}
