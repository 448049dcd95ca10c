//! A single named container group.
//!
//! Owns the group's creation spec and count bounds and implements the
//! reconciliation algorithms that converge the running or available
//! container count to a requested target with minimal churn. Available
//! containers are re-started before new ones are created, and scale-down
//! stops containers rather than destroying them.

use crate::pool::spec::{GroupSpec, SpecOverrides};
use crate::pool::{PoolError, Result};
use crate::runtime::{
    ContainerFilter, ContainerHandle, ContainerState, CreateRequest, ExecOutput, RuntimeClient,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Separator between the group identifier and the random suffix in container
/// names. Group identifiers must not contain it.
pub const NAME_DELIMITER: &str = "--";

/// Reject identifiers that cannot form unambiguous container names.
pub(crate) fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(PoolError::InvalidRequest(
            "group identifier must not be empty".to_string(),
        ));
    }
    if identifier.contains(NAME_DELIMITER) {
        return Err(PoolError::InvalidRequest(format!(
            "group identifier {identifier:?} must not contain {NAME_DELIMITER:?}"
        )));
    }
    Ok(())
}

/// Mutable configuration of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Advisory lower bound; stored and served, never auto-enforced.
    #[serde(default)]
    pub min_count: usize,

    /// Upper bound on the total container count; `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,

    #[serde(rename = "specs")]
    pub spec: GroupSpec,
}

impl GroupConfig {
    pub fn new(spec: GroupSpec) -> Self {
        Self {
            min_count: 0,
            max_count: None,
            spec,
        }
    }

    /// # Errors
    ///
    /// Fails with [`PoolError::InvalidRequest`] on an empty image or
    /// `min_count > max_count`.
    pub fn validate(&self) -> Result<()> {
        if self.spec.image.is_empty() {
            return Err(PoolError::InvalidRequest(
                "spec image must not be empty".to_string(),
            ));
        }
        if let Some(max) = self.max_count {
            if self.min_count > max {
                return Err(PoolError::InvalidRequest(format!(
                    "min_count {} exceeds max_count {max}",
                    self.min_count
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of a best-effort teardown.
///
/// Teardown never fails; daemon errors along the way are logged and recorded
/// here so callers can still observe them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownReport {
    pub container_id: String,
    /// Daemon failures that were swallowed, in occurrence order.
    pub suppressed: Vec<String>,
}

impl TeardownReport {
    fn new(container_id: &str) -> Self {
        Self {
            container_id: container_id.to_string(),
            suppressed: Vec::new(),
        }
    }

    fn suppress(&mut self, warning: String) {
        self.suppressed.push(warning);
    }

    /// True when every daemon call along the teardown succeeded.
    pub fn clean(&self) -> bool {
        self.suppressed.is_empty()
    }
}

/// One named pool of containers sharing a creation spec and count bounds.
///
/// Membership is derived from the `"<identifier>--<uuid>"` name convention
/// via filtered daemon queries; nothing is cached in memory. Mutating
/// operations are serialized through an internal mutex so concurrent
/// reconcile requests queue instead of racing on the observed counts.
pub struct ContainerGroup {
    identifier: String,
    runtime: Arc<dyn RuntimeClient>,
    config: RwLock<GroupConfig>,
    ops: Mutex<()>,
}

impl std::fmt::Debug for ContainerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerGroup")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

impl ContainerGroup {
    pub(crate) fn new(
        identifier: impl Into<String>,
        runtime: Arc<dyn RuntimeClient>,
        config: GroupConfig,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            runtime,
            config: RwLock::new(config),
            ops: Mutex::new(()),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub async fn config(&self) -> GroupConfig {
        self.config.read().await.clone()
    }

    /// Apply a partial update to the group's bounds and spec, in place.
    pub async fn update_config(
        &self,
        min_count: Option<usize>,
        max_count: Option<usize>,
        spec: Option<GroupSpec>,
    ) -> Result<GroupConfig> {
        let mut guard = self.config.write().await;
        let mut updated = guard.clone();
        if let Some(min) = min_count {
            updated.min_count = min;
        }
        if let Some(max) = max_count {
            updated.max_count = Some(max);
        }
        if let Some(spec) = spec {
            updated.spec = spec;
        }
        updated.validate()?;
        *guard = updated.clone();
        Ok(updated)
    }

    fn name_prefix(&self) -> String {
        format!("{}{}", self.identifier, NAME_DELIMITER)
    }

    fn next_container_name(&self) -> String {
        format!("{}{}{}", self.identifier, NAME_DELIMITER, Uuid::new_v4())
    }

    /// List this group's containers, optionally restricted to some states.
    /// Stopped containers are always visible.
    pub async fn list(&self, states: &[ContainerState]) -> Result<Vec<ContainerHandle>> {
        let filter = ContainerFilter::name_prefix(self.name_prefix()).with_states(states);
        Ok(self.runtime.list(&filter).await?)
    }

    /// Containers not serving traffic: `created` or `exited`.
    pub async fn list_available(&self) -> Result<Vec<ContainerHandle>> {
        self.list(&[ContainerState::Created, ContainerState::Exited])
            .await
    }

    pub async fn list_running(&self) -> Result<Vec<ContainerHandle>> {
        self.list(&[ContainerState::Running]).await
    }

    /// Fetch one member container by id.
    ///
    /// The daemon query is scoped by id; anything that does not carry this
    /// group's name prefix is treated as absent.
    pub async fn get(&self, container_id: &str) -> Result<ContainerHandle> {
        let handles = self.runtime.list(&ContainerFilter::id(container_id)).await?;
        if handles.len() > 1 {
            warn!(
                group = %self.identifier,
                container = container_id,
                matches = handles.len(),
                "id filter matched more than one container"
            );
        }
        let prefix = self.name_prefix();
        handles
            .into_iter()
            .find(|h| h.name.starts_with(&prefix))
            .ok_or_else(|| PoolError::ContainerNotFound {
                group: self.identifier.clone(),
                container: container_id.to_string(),
            })
    }

    /// Create one container from the group spec, optionally starting it.
    ///
    /// Fails with [`PoolError::MaxCountReached`] before any daemon call when
    /// the group is full. Returns the freshly re-fetched handle.
    pub async fn create(
        &self,
        start: bool,
        overrides: Option<&SpecOverrides>,
    ) -> Result<ContainerHandle> {
        let _guard = self.ops.lock().await;
        self.create_locked(start, overrides).await
    }

    async fn create_locked(
        &self,
        start: bool,
        overrides: Option<&SpecOverrides>,
    ) -> Result<ContainerHandle> {
        let config = self.config.read().await.clone();

        if let Some(max) = config.max_count {
            let total = self.list(&[]).await?.len();
            if total >= max {
                return Err(PoolError::MaxCountReached {
                    group: self.identifier.clone(),
                    max,
                });
            }
        }

        let (image, payload) = config.spec.creation_payload(overrides)?;
        let name = self.next_container_name();
        debug!(group = %self.identifier, name = %name, image = %image, "creating container");

        let id = self
            .runtime
            .create(&CreateRequest {
                name,
                image,
                payload,
            })
            .await?;

        // A crash between create and start leaves a `created` container,
        // which reconciliation picks up as available.
        if start {
            self.runtime.start(&id).await?;
        }

        self.get(&id).await
    }

    /// Start a container and return its re-fetched handle. Starting an
    /// already-running container surfaces whatever the daemon returns.
    pub async fn start(&self, container_id: &str) -> Result<ContainerHandle> {
        let _guard = self.ops.lock().await;
        self.runtime.start(container_id).await?;
        self.get(container_id).await
    }

    /// Stop a container and return its re-fetched handle.
    pub async fn stop(&self, container_id: &str) -> Result<ContainerHandle> {
        let _guard = self.ops.lock().await;
        self.runtime.stop(container_id).await?;
        self.get(container_id).await
    }

    /// Run a shell-style command inside a member container.
    ///
    /// Does not take the group lock: a long-running command must not block
    /// reconciliation. No timeout is imposed.
    pub async fn exec(&self, container_id: &str, command: &str) -> Result<ExecOutput> {
        let argv = shell_words::split(command)
            .map_err(|e| PoolError::InvalidRequest(format!("command: {e}")))?;
        if argv.is_empty() {
            return Err(PoolError::InvalidRequest(
                "command must not be empty".to_string(),
            ));
        }
        let handle = self.get(container_id).await?;
        Ok(self.runtime.exec(&handle.id, &argv).await?)
    }

    /// Tear down one member container.
    pub async fn remove(&self, container_id: &str) -> Result<TeardownReport> {
        let _guard = self.ops.lock().await;
        let handle = self.get(container_id).await?;
        Ok(self.kill_and_remove(&handle.id).await)
    }

    /// Tear down every member container regardless of state. A no-op on an
    /// empty group.
    pub async fn remove_all(&self) -> Result<Vec<TeardownReport>> {
        let _guard = self.ops.lock().await;
        let members = self.list(&[]).await?;
        let mut reports = Vec::with_capacity(members.len());
        for handle in &members {
            reports.push(self.kill_and_remove(&handle.id).await);
        }
        Ok(reports)
    }

    /// Tear down up to `count` containers, available ones first.
    ///
    /// Running containers are only touched when `force_used` is set and the
    /// available pool does not cover `count`. Selection within each state
    /// bucket follows list order.
    pub async fn remove_multiple(
        &self,
        count: usize,
        force_used: bool,
    ) -> Result<Vec<TeardownReport>> {
        let _guard = self.ops.lock().await;
        let mut reports = Vec::new();

        let available = self.list_available().await?;
        for handle in available.iter().take(count) {
            reports.push(self.kill_and_remove(&handle.id).await);
        }

        if reports.len() < count && force_used {
            let remainder = count - reports.len();
            let running = self.list_running().await?;
            for handle in running.iter().take(remainder) {
                reports.push(self.kill_and_remove(&handle.id).await);
            }
        }

        Ok(reports)
    }

    /// Converge the number of running containers to `target`.
    ///
    /// Scaling up re-starts available containers before creating new ones,
    /// since creation consumes the max-count budget; scaling down stops
    /// containers without destroying them. On a mid-loop failure the
    /// containers already started or created remain.
    pub async fn set_running_count(&self, target: usize) -> Result<()> {
        let _guard = self.ops.lock().await;

        let running = self.list_running().await?;
        let have = running.len();
        info!(group = %self.identifier, running = have, target, "reconciling running count");

        match target.cmp(&have) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Greater => {
                let shortfall = target - have;
                let available = self.list_available().await?;
                let restarted = shortfall.min(available.len());
                for handle in available.iter().take(restarted) {
                    debug!(group = %self.identifier, container = %handle.id, "starting available container");
                    self.runtime.start(&handle.id).await?;
                }
                for _ in restarted..shortfall {
                    self.create_locked(true, None).await?;
                }
                Ok(())
            }
            std::cmp::Ordering::Less => {
                for handle in running.iter().take(have - target) {
                    debug!(group = %self.identifier, container = %handle.id, "stopping container");
                    self.runtime.stop(&handle.id).await?;
                }
                Ok(())
            }
        }
    }

    /// Converge the number of available (`created`/`exited`) containers to
    /// `target`.
    ///
    /// Scaling up creates unstarted containers; scaling down tears down
    /// available containers only. Running containers are never touched.
    pub async fn set_available_count(&self, target: usize) -> Result<()> {
        let _guard = self.ops.lock().await;

        let available = self.list_available().await?;
        let have = available.len();
        info!(group = %self.identifier, available = have, target, "reconciling available count");

        match target.cmp(&have) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Greater => {
                for _ in have..target {
                    self.create_locked(false, None).await?;
                }
                Ok(())
            }
            std::cmp::Ordering::Less => {
                for handle in available.iter().take(have - target) {
                    self.kill_and_remove(&handle.id).await;
                }
                Ok(())
            }
        }
    }

    /// Best-effort kill-then-remove.
    ///
    /// Kills only when the container currently runs, falling back to waiting
    /// for a natural exit when the kill fails; then unconditionally attempts
    /// removal. Never fails: every daemon error is logged and recorded on
    /// the report.
    async fn kill_and_remove(&self, container_id: &str) -> TeardownReport {
        let mut report = TeardownReport::new(container_id);

        match self.get(container_id).await {
            Ok(handle) if handle.state == ContainerState::Running => {
                if let Err(e) = self.runtime.kill(container_id).await {
                    warn!(
                        group = %self.identifier,
                        container = container_id,
                        error = %e,
                        "kill failed, waiting for natural exit"
                    );
                    report.suppress(format!("kill: {e}"));
                    if let Err(e) = self.runtime.wait(container_id).await {
                        warn!(
                            group = %self.identifier,
                            container = container_id,
                            error = %e,
                            "wait failed"
                        );
                        report.suppress(format!("wait: {e}"));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    group = %self.identifier,
                    container = container_id,
                    error = %e,
                    "could not inspect container before removal"
                );
                report.suppress(format!("inspect: {e}"));
            }
        }

        if let Err(e) = self.runtime.remove(container_id).await {
            warn!(
                group = %self.identifier,
                container = container_id,
                error = %e,
                "remove failed"
            );
            report.suppress(format!("remove: {e}"));
        }

        if report.clean() {
            info!(group = %self.identifier, container = container_id, "container torn down");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifier_rejects_delimiter() {
        assert!(validate_identifier("redis").is_ok());
        assert!(validate_identifier("redis-cache").is_ok());
        assert!(matches!(
            validate_identifier("redis--cache"),
            Err(PoolError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_identifier(""),
            Err(PoolError::InvalidRequest(_))
        ));
    }

    #[test]
    fn config_validates_bounds() {
        let mut config = GroupConfig::new(GroupSpec::new("redis"));
        assert!(config.validate().is_ok());

        config.min_count = 3;
        config.max_count = Some(2);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidRequest(_))
        ));

        config.max_count = Some(3);
        assert!(config.validate().is_ok());

        // Unbounded groups accept any lower bound.
        config.max_count = None;
        config.min_count = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_empty_image() {
        let config = GroupConfig::new(GroupSpec::new(""));
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidRequest(_))
        ));
    }

    #[test]
    fn config_wire_shape_uses_specs_key() {
        let config: GroupConfig = serde_json::from_value(json!({
            "min_count": 1,
            "max_count": 5,
            "specs": {"image": "redis"}
        }))
        .unwrap();
        assert_eq!(config.min_count, 1);
        assert_eq!(config.max_count, Some(5));
        assert_eq!(config.spec.image, "redis");

        let round = serde_json::to_value(&config).unwrap();
        assert!(round.get("specs").is_some());
    }

    #[test]
    fn config_defaults_are_permissive() {
        let config: GroupConfig =
            serde_json::from_value(json!({"specs": {"image": "redis"}})).unwrap();
        assert_eq!(config.min_count, 0);
        assert_eq!(config.max_count, None);
    }

    #[test]
    fn teardown_report_tracks_suppressed_failures() {
        let mut report = TeardownReport::new("abc123");
        assert!(report.clean());
        report.suppress("kill: boom".to_string());
        assert!(!report.clean());
        assert_eq!(report.suppressed, vec!["kill: boom"]);
    }
}
