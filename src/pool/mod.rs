//! Container pool core.
//!
//! A pool is a registry of named groups; each group owns a creation spec,
//! min/max count bounds, and the reconciliation logic that converges the
//! running or available container count to a requested target.
//!
//! - [`spec`]: creation templates and override merging
//! - [`group`]: a single group's lifecycle and reconciliation operations
//! - [`registry`]: the identifier → group map
//!
//! Group membership is derived purely from the `"<group>--<uuid>"` container
//! name convention; the daemon is the sole source of truth and is re-queried
//! on every call.

pub mod group;
pub mod registry;
pub mod spec;

use crate::runtime::RuntimeError;

pub use group::{ContainerGroup, GroupConfig, TeardownReport, NAME_DELIMITER};
pub use registry::ContainerPool;
pub use spec::{GroupSpec, SpecOverrides};

/// Pool-level errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No group registered under this identifier.
    #[error("container group not found: {0}")]
    GroupNotFound(String),

    /// A group with this identifier is already registered.
    #[error("container group already declared: {0}")]
    GroupAlreadyDeclared(String),

    /// Creating one more container would exceed the group's upper bound.
    #[error("container group {group} already holds its maximum of {max} containers")]
    MaxCountReached { group: String, max: usize },

    /// No container with this id exists under the group's naming prefix.
    #[error("container not found in group {group}: {container}")]
    ContainerNotFound { group: String, container: String },

    /// Malformed input: group identifier, count bounds, command or state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Daemon failure, propagated as-is.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl PoolError {
    /// Stable error-kind name, reported to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::GroupNotFound(_) => "GroupNotFound",
            PoolError::GroupAlreadyDeclared(_) => "GroupAlreadyDeclared",
            PoolError::MaxCountReached { .. } => "MaxCountReached",
            PoolError::ContainerNotFound { .. } => "ContainerNotFound",
            PoolError::InvalidRequest(_) => "InvalidRequest",
            PoolError::Runtime(_) => "RuntimeApiError",
        }
    }
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
