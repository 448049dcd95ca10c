//! Container runtime abstraction.
//!
//! Defines the capability interface the pool core consumes ([`RuntimeClient`])
//! together with the handful of daemon-facing data types. The production
//! implementation lives in [`docker`] and talks to Docker/Podman via bollard;
//! tests substitute an in-memory mock.

pub mod docker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use docker::DockerRuntime;

/// Errors surfaced by a container runtime implementation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The daemon rejected a request with an HTTP status code.
    #[error("daemon API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// The creation options could not be translated into a daemon request.
    #[error("invalid container creation options: {0}")]
    InvalidSpec(String),

    /// A command execution inside a container failed before producing output.
    #[error("execution error: {0}")]
    Exec(String),

    /// Transport, connection or decoding failure.
    #[error("container runtime error: {0}")]
    Other(String),
}

/// Lifecycle state reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    /// State string the daemon reported but this crate does not know.
    Unknown,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "unknown",
        }
    }

    /// Parse a daemon state string, case-insensitively.
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized description of a container as the daemon reports it.
///
/// The leading `/` the daemon prefixes to names is already stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Human-readable status line, e.g. `Up 2 minutes`.
    pub status: String,
}

/// Filter for [`RuntimeClient::list`]. All populated fields must match.
///
/// Listing always includes non-running containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    pub name_prefix: Option<String>,
    pub id: Option<String>,
    pub states: Vec<ContainerState>,
}

impl ContainerFilter {
    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_states(mut self, states: &[ContainerState]) -> Self {
        self.states = states.to_vec();
        self
    }
}

/// A fully resolved container creation request.
///
/// `payload` holds Docker Engine API `ContainerConfig` fields in wire casing
/// (`Cmd`, `Env`, `Labels`, …) and is forwarded to the daemon verbatim.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub image: String,
    pub payload: Map<String, Value>,
}

/// Collected output of a command executed inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, when the daemon reported one.
    pub exit_code: Option<i64>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability interface over a container engine daemon.
///
/// The pool core only ever talks to this trait; every call is potentially
/// blocking I/O and carries no timeout of its own.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// List containers matching `filter`, including stopped ones.
    async fn list(&self, filter: &ContainerFilter) -> Result<Vec<ContainerHandle>, RuntimeError>;

    /// Create a container and return its id. Does not start it.
    async fn create(&self, request: &CreateRequest) -> Result<String, RuntimeError>;

    async fn start(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop(&self, id: &str) -> Result<(), RuntimeError>;

    async fn kill(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove(&self, id: &str) -> Result<(), RuntimeError>;

    /// Block until the container exits.
    async fn wait(&self, id: &str) -> Result<(), RuntimeError>;

    /// Run `command` inside a running container and collect its output.
    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput, RuntimeError>;

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;
}
