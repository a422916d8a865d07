use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::bind::{parse_data, parse_port, resolve_path};
use super::descriptor::load;
use super::preset::Profile;
use super::{BindMode, LaunchConfig, NetworkAttachment, VolumeBind};
use crate::error::{LaunchError, Result};

/// The fields a preset or the command line may set. `None` and empty lists
/// mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub name: Option<String>,
    pub image: Option<String>,
    pub ports: Vec<String>,
    pub environment: Vec<String>,
    pub network: Option<String>,
    pub ip: Option<String>,
}

impl Settings {
    /// Keeps every field that is set and fills the rest from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            name: self.name.or(fallback.name),
            image: self.image.or(fallback.image),
            ports: if self.ports.is_empty() { fallback.ports } else { self.ports },
            environment: if self.environment.is_empty() {
                fallback.environment
            } else {
                self.environment
            },
            network: self.network.or(fallback.network),
            ip: self.ip.or(fallback.ip),
        }
    }
}

/// Raw launch parameters as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub explicit: Settings,
    pub data: Vec<String>,
    pub json: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub script_args: Vec<String>,
}

/// Builds a [`LaunchConfig`]. Layers, lowest precedence first: `defaults`,
/// `preset` (only for fields still unset), explicit command-line values, and
/// finally the keys present in the JSON descriptor.
pub fn assemble(
    request: &RunRequest,
    preset: Option<&Profile>,
    defaults: &Profile,
) -> Result<LaunchConfig> {
    let mut settings = request.explicit.clone();
    if let Some(preset) = preset {
        debug!("Updating args with '{}' defaults...", preset.name);
        settings = settings.or(preset.settings());
    }
    settings = settings.or(defaults.settings());

    let mut volumes = request
        .data
        .iter()
        .map(|token| parse_data(token))
        .collect::<Result<Vec<_>>>()?;

    if let Some(json) = &request.json {
        apply_descriptor(json, &mut settings, &mut volumes)?;
    }

    let command = match &request.script {
        Some(script) => {
            let (volume, filename) = script_volume(script)?;
            volumes.push(volume);

            let mut argv = vec!["python".to_string(), filename];
            argv.extend(request.script_args.iter().cloned());
            Some(shell_words::join(&argv))
        }
        None => None,
    };

    let mut mount_points = HashSet::new();
    for volume in &volumes {
        if !mount_points.insert(volume.container.as_str()) {
            return Err(LaunchError::invalid_bind(
                volume.to_string(),
                format!("container path {} is already mounted", volume.container),
            ));
        }
    }

    let image = settings
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| {
            LaunchError::Config("no image given; pass --image, --json or a preset".to_string())
        })?;

    let mut ports = BTreeMap::new();
    for token in &settings.ports {
        let (host, container) = parse_port(token)?;
        if let Some(existing) = ports.insert(container, host) {
            if existing != host {
                return Err(LaunchError::invalid_bind(
                    token.as_str(),
                    format!("container port {container} is already mapped to host port {existing}"),
                ));
            }
        }
    }

    for variable in &settings.environment {
        match variable.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => {
                return Err(LaunchError::Config(format!(
                    "environment variable '{variable}' must have the form KEY=VALUE"
                )))
            }
        }
    }

    let ip = settings.ip.as_deref().map(parse_ip).transpose()?;
    let network = match settings.network.filter(|name| !name.is_empty()) {
        Some(name) => Some(NetworkAttachment { name, ip }),
        None => {
            if request.explicit.ip.is_some() {
                warn!("Ignoring --ip since no network was given");
            }
            None
        }
    };

    Ok(LaunchConfig {
        name: settings.name.filter(|name| !name.is_empty()),
        image,
        volumes,
        ports,
        network,
        environment: settings.environment,
        command,
    })
}

fn parse_ip(value: &str) -> Result<Ipv4Addr> {
    value
        .parse()
        .map_err(|_| LaunchError::Config(format!("'{value}' is not a valid IPv4 address")))
}

fn apply_descriptor(
    json: &Path,
    settings: &mut Settings,
    volumes: &mut Vec<VolumeBind>,
) -> Result<()> {
    let descriptor = load(json)?;
    let bridge = descriptor.bridge();
    let json_dir = json
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    if let Some(name) = &bridge.container_name {
        settings.name = Some(name.clone());
    }
    if let Some(image) = &bridge.image {
        settings.image = Some(image.clone());
    }
    if let Some(data) = &bridge.data {
        for entry in data {
            volumes.push(entry.to_volume(json_dir)?);
        }
    }
    if let Some(port) = &bridge.port {
        settings.ports = vec![port.clone()];
    }
    if let Some(network) = &bridge.network {
        settings.network = Some(network.name.clone());
        if let Some(ip) = &network.ip {
            settings.ip = Some(ip.clone());
        }
    }

    Ok(())
}

/// The launch script is always mounted at `/root/<filename>`.
fn script_volume(script: &Path) -> Result<(VolumeBind, String)> {
    let host = resolve_path(script)?;
    if !host.is_file() {
        return Err(LaunchError::invalid_bind(
            script.display().to_string(),
            "script is not a file",
        ));
    }
    let filename = host
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| LaunchError::invalid_bind(script.display().to_string(), "script has no file name"))?;

    let volume = VolumeBind {
        host,
        container: format!("/root/{filename}"),
        mode: BindMode::Rw,
    };
    Ok((volume, filename))
}
