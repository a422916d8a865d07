pub mod novnc;
pub mod run;

use clap::Args;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{LaunchConfig, Profile, RunRequest, Settings, DOCKER_DEFAULTS, SIM_DEFAULTS};
use crate::docker::{
    ensure_runtime_available, interrupt, ContainerRuntime, ContainerSlot, DockerClient, DockerConfig,
    LifecycleController,
};
use crate::error::{LaunchError, Result};

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub dry_run: bool,
    pub docker: DockerConfig,
}

/// The two command families. They differ only in their built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Simulator defaults are baked in.
    Sim,
    /// Nothing is assumed; presets are opt-in.
    Docker,
}

impl Family {
    pub fn defaults(&self) -> &'static Profile {
        match self {
            Family::Sim => &SIM_DEFAULTS,
            Family::Docker => &DOCKER_DEFAULTS,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON file with docker configuration
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Name of the container
    #[arg(long)]
    pub name: Option<String>,

    /// Name of the image to run
    #[arg(long)]
    pub image: Option<String>,

    /// Data to pass to the container as a volume, as HOST[:CONTAINER]. Repeatable.
    #[arg(long, value_name = "HOST[:CONTAINER]")]
    pub data: Vec<String>,

    /// Ports to expose from the container, as HOST[:CONTAINER]. Repeatable.
    #[arg(long, value_name = "HOST[:CONTAINER]")]
    pub port: Vec<String>,

    /// Environment variables for the script, as KEY=VALUE. Repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub environment: Vec<String>,

    /// The network to communicate with
    #[arg(long)]
    pub network: Option<String>,

    /// The static ip address to use when connecting to the network
    #[arg(long)]
    pub ip: Option<String>,

    /// The script to run in the container
    pub script: PathBuf,

    /// Arguments for the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub script_args: Vec<String>,
}

impl RunArgs {
    pub fn to_request(&self) -> RunRequest {
        RunRequest {
            explicit: Settings {
                name: self.name.clone(),
                image: self.image.clone(),
                ports: self.port.clone(),
                environment: self.environment.clone(),
                network: self.network.clone(),
                ip: self.ip.clone(),
            },
            data: self.data.clone(),
            json: self.json.clone(),
            script: Some(self.script.clone()),
            script_args: self.script_args.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct NovncArgs {
    /// Name of the container [default: novnc]
    #[arg(long)]
    pub name: Option<String>,

    /// The network to communicate with [default: wa]
    #[arg(long)]
    pub network: Option<String>,

    /// The static ip address to use when connecting to the network [default: 172.20.0.4]
    #[arg(long)]
    pub ip: Option<String>,
}

/// Logs the plan and, unless this is a dry run, connects to the runtime and
/// returns a controller for it. A dry run prints the plan and returns `None`
/// without calling `connect`.
pub(crate) async fn launch<F, Fut>(
    config: &LaunchConfig,
    dry_run: bool,
    slot: Arc<ContainerSlot>,
    connect: F,
) -> Result<Option<LifecycleController>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<dyn ContainerRuntime>>>,
{
    config.log_plan();

    if dry_run {
        info!("Dry run, not contacting Docker");
        let plan = serde_json::to_string_pretty(config)
            .map_err(|e| LaunchError::Config(format!("cannot render plan: {e}")))?;
        println!("{plan}");
        return Ok(None);
    }

    let runtime = connect().await?;
    Ok(Some(LifecycleController::new(runtime, slot)))
}

/// Connects to Docker and installs the Ctrl-C handler for `slot`.
pub(crate) async fn connect_docker(
    docker: &DockerConfig,
    slot: Arc<ContainerSlot>,
) -> Result<Arc<dyn ContainerRuntime>> {
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerClient::connect(docker)?);
    ensure_runtime_available(runtime.as_ref()).await?;
    install_interrupt_handler(slot, runtime.clone())?;
    Ok(runtime)
}

fn install_interrupt_handler(slot: Arc<ContainerSlot>, runtime: Arc<dyn ContainerRuntime>) -> Result<()> {
    let handle = tokio::runtime::Handle::current();
    ctrlc::set_handler(move || {
        handle.block_on(interrupt(&slot, runtime.as_ref()));
        std::process::exit(0);
    })
    .map_err(|e| LaunchError::Io(std::io::Error::other(e)))
}
