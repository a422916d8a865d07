//! JSON launch descriptors.
//!
//! ```json
//! {
//!     "Type": "Bridge",
//!     "Container Name": "wasim-docker",
//!     "Image": "wiscauto/wa_simulator:latest",
//!     "Data": [{ "Host Path": "../data", "Host Path Is Relative To JSON": true }],
//!     "Port": "5555",
//!     "Network": { "Name": "wa", "IP": "172.30.0.3" }
//! }
//! ```
//!
//! Only `Type` is required. Keys this tool does not know about are ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::bind::{default_container_path, resolve_path};
use super::{BindMode, VolumeBind};
use crate::error::{LaunchError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "Type")]
pub enum Descriptor {
    Bridge(BridgeDescriptor),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeDescriptor {
    #[serde(rename = "Container Name")]
    pub container_name: Option<String>,
    #[serde(rename = "Image")]
    pub image: Option<String>,
    #[serde(rename = "Data")]
    pub data: Option<Vec<DataEntry>>,
    #[serde(rename = "Port")]
    pub port: Option<String>,
    #[serde(rename = "Network")]
    pub network: Option<NetworkEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataEntry {
    #[serde(rename = "Host Path")]
    pub host_path: String,
    #[serde(rename = "Host Path Is Relative To JSON", default)]
    pub relative_to_json: bool,
    #[serde(rename = "Container Path")]
    pub container_path: Option<String>,
    #[serde(rename = "Read Only", default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IP", alias = "IPv4")]
    pub ip: Option<String>,
}

impl Descriptor {
    pub fn parse(source: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|e| LaunchError::Schema(format!("{}: {}", origin.display(), e)))
    }

    pub fn bridge(&self) -> &BridgeDescriptor {
        match self {
            Descriptor::Bridge(bridge) => bridge,
        }
    }
}

/// Reads and validates the descriptor at `path`.
pub fn load(path: &Path) -> Result<Descriptor> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        LaunchError::Config(format!("cannot read descriptor {}: {}", path.display(), e))
    })?;
    Descriptor::parse(&source, path)
}

impl DataEntry {
    /// Resolves the entry to a bind mount. When `relative_to_json` is set the
    /// host path is joined onto `json_dir`, otherwise it is taken as given
    /// (absolute or relative to the working directory).
    pub fn to_volume(&self, json_dir: &Path) -> Result<VolumeBind> {
        if self.host_path.is_empty() {
            return Err(LaunchError::Schema("\"Host Path\" must not be empty".to_string()));
        }

        let host = if self.relative_to_json {
            resolve_path(json_dir.join(&self.host_path))?
        } else {
            resolve_path(PathBuf::from(&self.host_path))?
        };
        let container = match &self.container_path {
            Some(container) => container.clone(),
            None => default_container_path(&self.host_path, &host)?,
        };

        Ok(VolumeBind {
            host,
            container,
            mode: if self.read_only { BindMode::Ro } else { BindMode::Rw },
        })
    }
}
