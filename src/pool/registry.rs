//! Group registry.
//!
//! Maps group identifiers to [`ContainerGroup`] instances and enforces
//! uniqueness. All group/container state lives in the daemon plus this
//! in-process map; restarting the process loses group configuration.

use crate::pool::group::{validate_identifier, ContainerGroup, GroupConfig, TeardownReport};
use crate::pool::{PoolError, Result};
use crate::runtime::RuntimeClient;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Registry of container groups sharing one runtime client.
pub struct ContainerPool {
    runtime: Arc<dyn RuntimeClient>,
    groups: RwLock<HashMap<String, Arc<ContainerGroup>>>,
}

impl ContainerPool {
    pub fn new(runtime: Arc<dyn RuntimeClient>) -> Self {
        Self {
            runtime,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new group.
    ///
    /// With `update_image` set, the spec image is pulled eagerly before the
    /// group is stored; a pull failure is fatal to registration and is
    /// surfaced, not retried.
    ///
    /// # Errors
    ///
    /// Fails with [`PoolError::GroupAlreadyDeclared`] when the identifier is
    /// taken, [`PoolError::InvalidRequest`] on a malformed identifier or
    /// config, or a runtime error from the eager pull.
    pub async fn add_group(
        &self,
        identifier: &str,
        config: GroupConfig,
        update_image: bool,
    ) -> Result<Arc<ContainerGroup>> {
        validate_identifier(identifier)?;
        config.validate()?;

        if self.groups.read().await.contains_key(identifier) {
            return Err(PoolError::GroupAlreadyDeclared(identifier.to_string()));
        }

        // Pull outside the write lock; a slow registry pull must not block
        // every other group.
        if update_image {
            self.runtime.pull_image(&config.spec.image).await?;
        }

        let group = Arc::new(ContainerGroup::new(
            identifier,
            self.runtime.clone(),
            config,
        ));

        match self.groups.write().await.entry(identifier.to_string()) {
            Entry::Occupied(_) => Err(PoolError::GroupAlreadyDeclared(identifier.to_string())),
            Entry::Vacant(slot) => {
                info!(group = identifier, "container group declared");
                Ok(slot.insert(group).clone())
            }
        }
    }

    /// # Errors
    ///
    /// Fails with [`PoolError::GroupNotFound`] when no group is registered
    /// under `identifier`.
    pub async fn get_group(&self, identifier: &str) -> Result<Arc<ContainerGroup>> {
        self.groups
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| PoolError::GroupNotFound(identifier.to_string()))
    }

    /// Tear down every container of the group, then evict it.
    ///
    /// Not atomic with respect to concurrent operations on the same group:
    /// a request holding the group `Arc` may still complete against a
    /// daemon that no longer knows the containers.
    pub async fn delete_group(&self, identifier: &str) -> Result<Vec<TeardownReport>> {
        let group = self.get_group(identifier).await?;
        let reports = group.remove_all().await?;
        self.groups.write().await.remove(identifier);
        info!(group = identifier, "container group deleted");
        Ok(reports)
    }

    /// Registered group identifiers, sorted.
    pub async fn group_identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.groups.read().await.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }
}
