use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{connect_docker, launch, Family, Globals, RunArgs};
use crate::config::{assemble, LaunchConfig, WASIM};
use crate::docker::ContainerSlot;
use crate::error::Result;

/// Assembles the launch configuration for a `run` command.
pub fn plan(args: &RunArgs, family: Family, wasim: bool) -> Result<LaunchConfig> {
    let preset = wasim.then_some(&WASIM);
    if wasim && args.data.is_empty() {
        warn!("A data folder was not provided. You may want to pass one...");
    }

    assemble(&args.to_request(), preset, family.defaults())
}

/// Runs the script in a fresh container. Returns the process exit code.
pub async fn execute(args: &RunArgs, family: Family, wasim: bool, globals: &Globals) -> Result<i32> {
    debug!("Running '{:?} run' entrypoint...", family);

    let config = plan(args, family, wasim)?;
    let slot = Arc::new(ContainerSlot::default());

    let handler_slot = slot.clone();
    let controller = launch(&config, globals.dry_run, slot, || {
        connect_docker(&globals.docker, handler_slot)
    })
    .await?;
    let Some(controller) = controller else {
        return Ok(0);
    };

    let result = controller.run(&config).await?;
    let mut stdout = std::io::stdout();
    stdout.write_all(&result.output)?;
    stdout.flush()?;

    Ok(match result.exit_code {
        Some(0) | None => 0,
        Some(code) => {
            warn!("Script exited with code {}", code);
            i32::try_from(code).unwrap_or(1)
        }
    })
}
