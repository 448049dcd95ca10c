//! # dockerpool
//!
//! HTTP-managed pools of Docker containers with min/max sizing and lifecycle
//! reconciliation.
//!
//! A *group* is a named pool of containers stamped from one creation spec,
//! bounded by a min/max count and addressed through the
//! `"<group>--<uuid>"` name convention. The interesting part is the
//! reconciliation logic in [`pool::group`]: given a target count and the
//! observed container states it decides exactly which containers to create,
//! start, stop or remove. Available containers are reused before new ones
//! are created, and scale-down stops containers instead of destroying them.
//!
//! ## Architecture
//!
//! - [`runtime`]: the [`runtime::RuntimeClient`] capability trait over a
//!   container engine daemon, plus the bollard-backed
//!   [`runtime::DockerRuntime`]
//! - [`pool`]: group registry, creation specs and reconciliation
//! - [`api`]: thin poem route table translating JSON requests into pool
//!   calls and error kinds into status codes
//! - [`cli`]: server flags
//!
//! All state lives in the daemon plus the in-process registry; restarting
//! the server loses group configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dockerpool::pool::{ContainerPool, GroupConfig, GroupSpec};
//! use dockerpool::runtime::DockerRuntime;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Arc::new(DockerRuntime::connect(None).await?);
//!     let pool = ContainerPool::new(runtime);
//!
//!     let mut config = GroupConfig::new(GroupSpec::new("redis"));
//!     config.max_count = Some(5);
//!     let group = pool.add_group("redis", config, false).await?;
//!
//!     // Converge to three running containers, reusing what exists.
//!     group.set_running_count(3).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod pool;
pub mod runtime;

pub use pool::{
    ContainerGroup, ContainerPool, GroupConfig, GroupSpec, PoolError, SpecOverrides,
    TeardownReport,
};
pub use runtime::{
    ContainerHandle, ContainerState, DockerRuntime, ExecOutput, RuntimeClient, RuntimeError,
};
