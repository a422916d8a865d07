use bollard::errors::Error as DockerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid bind spec '{token}': {reason}")]
    InvalidBindSpec { token: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to pull image {image}: {source}")]
    ImagePull {
        image: String,
        #[source]
        source: DockerError,
    },

    #[error("Failed to create network {network}: {source}")]
    NetworkCreate {
        network: String,
        #[source]
        source: DockerError,
    },

    #[error("Container runtime error while trying to {action}: {source}")]
    ContainerRuntime {
        action: &'static str,
        #[source]
        source: DockerError,
    },

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    pub fn invalid_bind(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBindSpec {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn runtime(action: &'static str) -> impl FnOnce(DockerError) -> Self {
        move |source| Self::ContainerRuntime { action, source }
    }

    /// Pre-flight errors are raised before the container runtime is touched,
    /// so nothing needs to be cleaned up after them.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingDependency(_)
                | Self::InvalidBindSpec { .. }
                | Self::Schema(_)
                | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
