//! A [`ContainerRuntime`] that records every call instead of talking to Docker.

use async_trait::async_trait;
use bollard::container::Config;
use bollard::errors::Error as DockerError;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use super::{ContainerRuntime, ExecOutput};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ping,
    ImageExists(String),
    PullImage(String),
    NetworkExists(String),
    CreateNetwork { name: String, subnet: Option<String> },
    CreateContainer(Option<String>),
    StartContainer(String),
    ConnectNetwork { network: String, container: String, ip: Option<Ipv4Addr> },
    Exec { container: String, cmd: Vec<String>, env: Vec<String> },
    KillContainer(String),
    RemoveContainer(String),
}

/// Lets a test run code while an exec is in flight.
struct ExecGate {
    entered: oneshot::Sender<()>,
    resume: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<Call>>,
    images: Mutex<HashSet<String>>,
    networks: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<&'static str>>,
    containers: Mutex<Vec<Config<String>>>,
    exec_output: Mutex<ExecOutput>,
    exec_gate: Mutex<Option<ExecGate>>,
    exec_fails_once_killed: Mutex<bool>,
}

#[derive(Clone, Default)]
pub struct RecordingRuntime {
    inner: Arc<Inner>,
}

impl RecordingRuntime {
    pub fn with_image(self, image: &str) -> Self {
        self.inner.images.lock().unwrap().insert(image.to_string());
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.inner.networks.lock().unwrap().insert(name.to_string());
        self
    }

    /// Makes the named trait method fail with a 500 from the engine.
    pub fn failing(self, operation: &'static str) -> Self {
        self.inner.failing.lock().unwrap().insert(operation);
        self
    }

    pub fn with_exec_output(self, output: &str, exit_code: i64) -> Self {
        *self.inner.exec_output.lock().unwrap() = ExecOutput {
            output: output.as_bytes().to_vec(),
            exit_code: Some(exit_code),
        };
        self
    }

    /// Exec answers 404 when its container was killed while it ran, as the
    /// engine does for an auto-removed container.
    pub fn exec_fails_once_killed(self) -> Self {
        *self.inner.exec_fails_once_killed.lock().unwrap() = true;
        self
    }

    /// Blocks the next exec until `resume` fires; `entered` fires once it is in flight.
    pub fn pause_exec(&self, entered: oneshot::Sender<()>, resume: oneshot::Receiver<()>) {
        *self.inner.exec_gate.lock().unwrap() = Some(ExecGate { entered, resume });
    }

    /// Container configurations passed to `create_container`, in order.
    pub fn containers(&self) -> Vec<Config<String>> {
        self.inner.containers.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, filter: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls().into_iter().filter(|c| filter(c)).collect()
    }

    pub fn count(&self, filter: impl Fn(&Call) -> bool) -> usize {
        self.calls_matching(filter).len()
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<(), DockerError> {
        self.inner.calls.lock().unwrap().push(call);
        if self.inner.failing.lock().unwrap().contains(operation) {
            return Err(DockerError::DockerResponseServerError {
                status_code: 500,
                message: format!("{operation} failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn ping(&self) -> Result<String, DockerError> {
        self.record(Call::Ping, "ping")?;
        Ok("27.0.0-test".to_string())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, DockerError> {
        self.record(Call::ImageExists(image.to_string()), "image_exists")?;
        Ok(self.inner.images.lock().unwrap().contains(image))
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        self.record(Call::PullImage(image.to_string()), "pull_image")?;
        self.inner.images.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    async fn network_exists(&self, name: &str) -> Result<bool, DockerError> {
        self.record(Call::NetworkExists(name.to_string()), "network_exists")?;
        Ok(self.inner.networks.lock().unwrap().contains(name))
    }

    async fn create_network(&self, name: &str, subnet: Option<String>) -> Result<(), DockerError> {
        self.record(
            Call::CreateNetwork {
                name: name.to_string(),
                subnet,
            },
            "create_network",
        )?;
        self.inner.networks.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn create_container(
        &self,
        name: Option<&str>,
        config: Config<String>,
    ) -> Result<String, DockerError> {
        self.record(Call::CreateContainer(name.map(str::to_string)), "create_container")?;
        self.inner.containers.lock().unwrap().push(config);
        Ok("c0ffee".to_string())
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(Call::StartContainer(id.to_string()), "start_container")
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        ip: Option<Ipv4Addr>,
    ) -> Result<(), DockerError> {
        self.record(
            Call::ConnectNetwork {
                network: network.to_string(),
                container: container.to_string(),
                ip,
            },
            "connect_network",
        )
    }

    async fn exec(
        &self,
        container: &str,
        cmd: Vec<String>,
        env: Vec<String>,
    ) -> Result<ExecOutput, DockerError> {
        self.record(
            Call::Exec {
                container: container.to_string(),
                cmd,
                env,
            },
            "exec",
        )?;

        let gate = self.inner.exec_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.resume.await;
        }

        let killed = self.calls().contains(&Call::KillContainer(container.to_string()));
        if killed && *self.inner.exec_fails_once_killed.lock().unwrap() {
            return Err(DockerError::DockerResponseServerError {
                status_code: 404,
                message: "No such exec instance".to_string(),
            });
        }

        Ok(self.inner.exec_output.lock().unwrap().clone())
    }

    async fn kill_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(Call::KillContainer(id.to_string()), "kill_container")
    }

    async fn remove_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(Call::RemoveContainer(id.to_string()), "remove_container")
    }
}
