use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::container::{container_config, ContainerMode};
use super::ensure::{ensure_image, ensure_network};
use super::{is_not_found, ContainerRuntime, ExecOutput};
use crate::config::LaunchConfig;
use crate::error::{LaunchError, Result};

/// The container currently owned by a launch, shared with the interrupt handler.
///
/// Whoever takes the handle out of the slot is responsible for killing the
/// container, so it is killed at most once.
#[derive(Debug, Default)]
pub struct ContainerSlot {
    container: Mutex<Option<String>>,
    interrupted: AtomicBool,
}

impl ContainerSlot {
    pub fn set(&self, id: String) {
        *self.lock() = Some(id);
    }

    pub fn take(&self) -> Option<String> {
        self.lock().take()
    }

    /// Marks the launch as interrupted and takes the handle, if any.
    pub fn interrupt(&self) -> Option<String> {
        self.interrupted.store(true, Ordering::SeqCst);
        self.take()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.container.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Body of the Ctrl-C handler: kill whatever container exists right now.
pub async fn interrupt(slot: &ContainerSlot, runtime: &dyn ContainerRuntime) {
    match slot.interrupt() {
        Some(id) => {
            info!("Stopping container.");
            cleanup(runtime, &id).await;
        }
        None => debug!("Interrupted before a container was created"),
    }
}

/// Best-effort teardown. Failures are logged, never returned.
async fn cleanup(runtime: &dyn ContainerRuntime, id: &str) {
    match runtime.kill_container(id).await {
        Ok(()) => {}
        Err(e) if is_not_found(&e) => debug!("Container {} is already gone", id),
        Err(e) => {
            warn!("Failed to kill container {}: {}", id, e);
            // A container that never started is not auto-removed.
            if let Err(e) = runtime.remove_container(id).await {
                if !is_not_found(&e) {
                    warn!("Failed to remove container {}: {}", id, e);
                }
            }
        }
    }
}

pub struct LifecycleController {
    runtime: Arc<dyn ContainerRuntime>,
    slot: Arc<ContainerSlot>,
}

impl LifecycleController {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, slot: Arc<ContainerSlot>) -> Self {
        Self { runtime, slot }
    }

    /// Starts a shell container, runs `config.command` in it, and kills the
    /// container afterwards, whatever the outcome.
    pub async fn run(&self, config: &LaunchConfig) -> Result<ExecOutput> {
        let command = config
            .command
            .as_deref()
            .ok_or_else(|| LaunchError::Config("no command to execute".to_string()))?;
        let argv = shell_words::split(command)
            .map_err(|e| LaunchError::Config(format!("cannot parse command '{command}': {e}")))?;

        self.prepare(config).await?;
        let id = self.create(config, ContainerMode::Shell).await?;

        let result = self.execute(&id, config, argv).await;
        self.finish(result).await
    }

    /// Starts a service container and leaves it running. Returns its id.
    pub async fn serve(&self, config: &LaunchConfig) -> Result<String> {
        self.prepare(config).await?;
        let id = self.create(config, ContainerMode::Service).await?;

        match self.start_and_attach(&id, config).await {
            Ok(()) => {
                // The container outlives this process from here on.
                self.slot.take();
                info!("Container {} is running", id);
                Ok(id)
            }
            Err(e) => self.finish(Err(e)).await,
        }
    }

    fn checkpoint(&self) -> Result<()> {
        if self.slot.is_interrupted() {
            return Err(LaunchError::Interrupted);
        }
        Ok(())
    }

    async fn prepare(&self, config: &LaunchConfig) -> Result<()> {
        self.checkpoint()?;
        ensure_image(self.runtime.as_ref(), &config.image).await?;
        if let Some(network) = &config.network {
            ensure_network(self.runtime.as_ref(), &network.name, network.ip).await?;
        }
        self.checkpoint()
    }

    async fn create(&self, config: &LaunchConfig, mode: ContainerMode) -> Result<String> {
        let id = self
            .runtime
            .create_container(config.name.as_deref(), container_config(config, mode))
            .await
            .map_err(LaunchError::runtime("create container"))?;
        self.slot.set(id.clone());
        Ok(id)
    }

    async fn start_and_attach(&self, id: &str, config: &LaunchConfig) -> Result<()> {
        self.runtime
            .start_container(id)
            .await
            .map_err(LaunchError::runtime("start container"))?;
        self.checkpoint()?;

        if let Some(network) = &config.network {
            self.runtime
                .connect_network(&network.name, id, network.ip)
                .await
                .map_err(LaunchError::runtime("connect container to network"))?;
            self.checkpoint()?;
        }

        Ok(())
    }

    async fn execute(&self, id: &str, config: &LaunchConfig, argv: Vec<String>) -> Result<ExecOutput> {
        self.start_and_attach(id, config).await?;

        let output = self
            .runtime
            .exec(id, argv, config.environment.clone())
            .await
            .map_err(LaunchError::runtime("execute command"))?;
        self.checkpoint()?;

        Ok(output)
    }

    /// Tears down the container if this launch still owns it, then reports
    /// `result`. An interrupt observed during the launch wins over any outcome.
    async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        if let Some(id) = self.slot.take() {
            cleanup(self.runtime.as_ref(), &id).await;
        }

        if self.slot.is_interrupted() {
            if let Err(e) = &result {
                debug!("Discarding error after interrupt: {}", e);
            }
            return Err(LaunchError::Interrupted);
        }
        result
    }
}
