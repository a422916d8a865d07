use std::sync::Arc;
use tracing::debug;

use super::{connect_docker, launch, Family, Globals, NovncArgs};
use crate::config::{assemble, LaunchConfig, RunRequest, Settings, NOVNC};
use crate::docker::ContainerSlot;
use crate::error::Result;

pub fn plan(args: &NovncArgs, family: Family) -> Result<LaunchConfig> {
    let request = RunRequest {
        explicit: Settings {
            name: args.name.clone(),
            network: args.network.clone(),
            ip: args.ip.clone(),
            ..Default::default()
        },
        ..Default::default()
    };

    assemble(&request, Some(&NOVNC), family.defaults())
}

/// Starts the noVNC container and leaves it running in the background.
pub async fn execute(args: &NovncArgs, family: Family, globals: &Globals) -> Result<i32> {
    debug!("Running '{:?} novnc' entrypoint...", family);

    let config = plan(args, family)?;
    let slot = Arc::new(ContainerSlot::default());

    let handler_slot = slot.clone();
    let controller = launch(&config, globals.dry_run, slot, || {
        connect_docker(&globals.docker, handler_slot)
    })
    .await?;
    let Some(controller) = controller else {
        return Ok(0);
    };

    let id = controller.serve(&config).await?;
    println!("{id}");
    Ok(0)
}
