//! Shared in-memory mock of the container runtime.
//!
//! Simulates a daemon's container table with insertion-ordered listing,
//! plus failure injection for the teardown paths.

// Each test binary uses a different slice of the helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use dockerpool::runtime::{
    ContainerFilter, ContainerHandle, ContainerState, CreateRequest, ExecOutput, RuntimeClient,
    RuntimeError,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MockContainer {
    id: String,
    name: String,
    image: String,
    state: ContainerState,
}

impl MockContainer {
    fn handle(&self) -> ContainerHandle {
        ContainerHandle {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            state: self.state,
            status: self.state.to_string(),
        }
    }
}

/// In-memory [`RuntimeClient`] with deterministic list order and failure
/// injection.
#[derive(Default)]
pub struct MockRuntime {
    containers: Mutex<Vec<MockContainer>>,
    next_id: AtomicUsize,
    /// When set, `kill` fails with a daemon API error.
    pub fail_kill: AtomicBool,
    /// When set, `remove` fails with a daemon API error.
    pub fail_remove: AtomicBool,
    /// When set, `pull_image` fails with a daemon API error.
    pub fail_pull: AtomicBool,
    /// Number of `create` calls that reached the daemon.
    pub create_calls: AtomicUsize,
    /// Images pulled, in order.
    pub pulled: Mutex<Vec<String>>,
    /// Commands executed, as `(container_id, argv)`.
    pub exec_log: Mutex<Vec<(String, Vec<String>)>>,
}

fn api_err(code: u16, message: &str) -> RuntimeError {
    RuntimeError::Api {
        code,
        message: message.to_string(),
    }
}

impl MockRuntime {
    /// Insert a container directly, bypassing the pool. Returns its id.
    pub fn seed(&self, name: &str, image: &str, state: ContainerState) -> String {
        let id = format!("seeded-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers.lock().unwrap().push(MockContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            state,
        });
        id
    }

    pub fn state_of(&self, id: &str) -> Option<ContainerState> {
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state)
    }

    pub fn container_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    fn set_state(
        &self,
        id: &str,
        from: Option<ContainerState>,
        to: ContainerState,
        conflict: &str,
    ) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| api_err(404, "no such container"))?;
        if let Some(required) = from {
            if container.state != required {
                return Err(api_err(304, conflict));
            }
        }
        container.state = to;
        Ok(())
    }
}

#[async_trait]
impl RuntimeClient for MockRuntime {
    async fn list(&self, filter: &ContainerFilter) -> Result<Vec<ContainerHandle>, RuntimeError> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .iter()
            .filter(|c| filter.id.as_deref().is_none_or(|id| c.id == id))
            .filter(|c| {
                filter
                    .name_prefix
                    .as_deref()
                    .is_none_or(|p| c.name.starts_with(p))
            })
            .filter(|c| filter.states.is_empty() || filter.states.contains(&c.state))
            .map(MockContainer::handle)
            .collect())
    }

    async fn create(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        if containers.iter().any(|c| c.name == request.name) {
            return Err(api_err(409, "name already in use"));
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("container-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        containers.push(MockContainer {
            id: id.clone(),
            name: request.name.clone(),
            image: request.image.clone(),
            state: ContainerState::Created,
        });
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        let state = self
            .state_of(id)
            .ok_or_else(|| api_err(404, "no such container"))?;
        if state == ContainerState::Running {
            return Err(api_err(304, "container already started"));
        }
        self.set_state(id, None, ContainerState::Running, "")
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        self.set_state(
            id,
            Some(ContainerState::Running),
            ContainerState::Exited,
            "container already stopped",
        )
    }

    async fn kill(&self, id: &str) -> Result<(), RuntimeError> {
        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(api_err(500, "cannot kill container"));
        }
        self.set_state(
            id,
            Some(ContainerState::Running),
            ContainerState::Exited,
            "container not running",
        )
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(api_err(500, "cannot remove container"));
        }
        let mut containers = self.containers.lock().unwrap();
        let before = containers.len();
        containers.retain(|c| c.id != id);
        if containers.len() == before {
            return Err(api_err(404, "no such container"));
        }
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<(), RuntimeError> {
        // The mock container "exits naturally" the moment someone waits.
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| api_err(404, "no such container"))?;
        container.state = ContainerState::Exited;
        Ok(())
    }

    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput, RuntimeError> {
        let state = self
            .state_of(id)
            .ok_or_else(|| api_err(404, "no such container"))?;
        if state != ContainerState::Running {
            return Err(api_err(409, "container is not running"));
        }
        self.exec_log
            .lock()
            .unwrap()
            .push((id.to_string(), command.to_vec()));
        Ok(ExecOutput {
            stdout: format!("{}\n", command.join(" ")),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.fail_pull.load(Ordering::SeqCst) {
            return Err(api_err(500, "pull failed"));
        }
        self.pulled.lock().unwrap().push(image.to_string());
        Ok(())
    }
}
