//! Docker/Podman implementation of [`RuntimeClient`].
//!
//! Connects to the local daemon via bollard with automatic fallback to
//! rootless/system Podman sockets, and translates the pool's capability calls
//! into Engine API requests.

use crate::runtime::{
    ContainerFilter, ContainerHandle, ContainerState, CreateRequest, ExecOutput, RuntimeClient,
    RuntimeError,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::stream::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Seconds the daemon waits before SIGKILL on a graceful stop.
const STOP_TIMEOUT_SECS: i64 = 10;

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => RuntimeError::Api {
                code: status_code,
                message,
            },
            other => RuntimeError::Other(other.to_string()),
        }
    }
}

/// bollard-backed runtime client.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to a container engine daemon and verify the connection.
    ///
    /// With an explicit `docker_host` the URI is used as-is (`unix://` or
    /// `tcp://`/`http://`). Otherwise the local defaults are tried first,
    /// then the rootless and system Podman sockets.
    ///
    /// # Errors
    ///
    /// Returns an error if no daemon is reachable or the ping fails.
    pub async fn connect(docker_host: Option<&str>) -> Result<Self, RuntimeError> {
        let docker = match docker_host {
            Some(uri) => Self::connect_uri(uri)?,
            None => Self::connect_defaults()?,
        };

        docker.ping().await?;
        debug!("container runtime ping successful");

        Ok(Self { docker })
    }

    fn connect_uri(uri: &str) -> Result<Docker, RuntimeError> {
        debug!("connecting to container runtime at {uri}");
        let docker = if uri.starts_with("unix://") {
            Docker::connect_with_socket(uri, 120, bollard::API_DEFAULT_VERSION)?
        } else {
            Docker::connect_with_http(uri, 120, bollard::API_DEFAULT_VERSION)?
        };
        info!("connected to container runtime at {uri}");
        Ok(docker)
    }

    fn connect_defaults() -> Result<Docker, RuntimeError> {
        debug!("attempting to connect to container runtime...");

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                info!("connected to container runtime via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("local defaults failed: {e}");
            }
        }

        #[cfg(unix)]
        {
            // Rootless Podman socket
            if let Ok(home) = std::env::var("HOME") {
                let podman_socket = format!("unix://{home}/run/podman/podman.sock");
                debug!("trying Podman socket: {podman_socket}");
                match Docker::connect_with_socket(&podman_socket, 120, bollard::API_DEFAULT_VERSION)
                {
                    Ok(docker) => {
                        info!("connected to Podman via rootless socket");
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman rootless socket failed: {e}");
                    }
                }
            }

            let system_socket = "unix:///run/podman/podman.sock";
            debug!("trying system Podman socket: {system_socket}");
            match Docker::connect_with_socket(system_socket, 120, bollard::API_DEFAULT_VERSION) {
                Ok(docker) => {
                    info!("connected to Podman via system socket");
                    return Ok(docker);
                }
                Err(e) => {
                    debug!("Podman system socket failed: {e}");
                }
            }
        }

        Err(RuntimeError::Other(
            "failed to connect to Docker or Podman; is the daemon running?".to_string(),
        ))
    }

    fn handle_from_summary(summary: bollard::models::ContainerSummary) -> ContainerHandle {
        let name = summary
            .names
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();

        ContainerHandle {
            id: summary.id.unwrap_or_default(),
            name,
            image: summary.image.unwrap_or_default(),
            state: summary
                .state
                .map(|s| ContainerState::parse(&s.to_string()))
                .unwrap_or(ContainerState::Unknown),
            status: summary.status.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    async fn list(&self, filter: &ContainerFilter) -> Result<Vec<ContainerHandle>, RuntimeError> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(prefix) = &filter.name_prefix {
            // Daemon names carry a leading slash; anchoring on it turns the
            // substring match into a prefix match.
            filters.insert("name".to_string(), vec![format!("/{prefix}")]);
        }
        if let Some(id) = &filter.id {
            filters.insert("id".to_string(), vec![id.clone()]);
        }
        if !filter.states.is_empty() {
            filters.insert(
                "status".to_string(),
                filter.states.iter().map(|s| s.to_string()).collect(),
            );
        }

        let summaries = self
            .docker
            .list_containers(Some(bollard::container::ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await?;

        let mut handles: Vec<ContainerHandle> = summaries
            .into_iter()
            .map(Self::handle_from_summary)
            .collect();
        if let Some(prefix) = &filter.name_prefix {
            handles.retain(|h| h.name.starts_with(prefix.as_str()));
        }

        Ok(handles)
    }

    async fn create(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        let mut body = request.payload.clone();
        body.insert("Image".to_string(), Value::String(request.image.clone()));
        let config: bollard::container::Config<String> =
            serde_json::from_value(Value::Object(body))
                .map_err(|e| RuntimeError::InvalidSpec(e.to_string()))?;

        debug!("creating container: {}", request.name);

        let options = bollard::container::CreateContainerOptions {
            name: request.name.as_str(),
            ..Default::default()
        };

        let response = self.docker.create_container(Some(options), config).await?;

        info!("created container: {} ({})", request.name, response.id);
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        debug!("starting container: {id}");
        self.docker
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await?;
        info!("started container: {id}");
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        debug!("stopping container: {id}");
        self.docker
            .stop_container(
                id,
                Some(bollard::container::StopContainerOptions {
                    t: STOP_TIMEOUT_SECS,
                }),
            )
            .await?;
        info!("stopped container: {id}");
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<(), RuntimeError> {
        debug!("killing container: {id}");
        self.docker
            .kill_container(id, None::<bollard::container::KillContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        debug!("removing container: {id}");
        self.docker
            .remove_container(id, None::<bollard::container::RemoveContainerOptions>)
            .await?;
        info!("removed container: {id}");
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<(), RuntimeError> {
        debug!("waiting for container to exit: {id}");
        let mut stream = self
            .docker
            .wait_container(id, None::<bollard::container::WaitContainerOptions<String>>);
        while let Some(result) = stream.next().await {
            match result {
                Ok(_) => {}
                // A non-zero exit code is still an exit.
                Err(bollard::errors::Error::DockerContainerWaitError { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput, RuntimeError> {
        debug!("executing command in container {id}: {command:?}");

        let exec = self
            .docker
            .create_exec(
                id,
                CreateExecOptions {
                    cmd: Some(command.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let start_results = self.docker.start_exec(&exec.id, None).await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        match start_results {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(result) = output.next().await {
                    match result {
                        Ok(log) => {
                            let text = log.to_string();
                            match log {
                                bollard::container::LogOutput::StdOut { .. } => {
                                    stdout.push_str(&text);
                                }
                                bollard::container::LogOutput::StdErr { .. } => {
                                    stderr.push_str(&text);
                                }
                                _ => {}
                            }
                        }
                        Err(e) => {
                            return Err(RuntimeError::Exec(format!("failed to read output: {e}")));
                        }
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(RuntimeError::Exec("unexpected detached execution".to_string()));
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        debug!("command executed with exit code: {:?}", inspect.exit_code);

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspect.exit_code,
        })
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!("pulling image: {image}");

        let mut stream = self.docker.create_image(
            Some(bollard::image::CreateImageOptions {
                from_image: image,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            let progress = result?;
            if let Some(status) = progress.status {
                debug!("pull status: {status}");
            }
        }

        info!("successfully pulled image: {image}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker/Podman to be running
    async fn connect_and_list() {
        let runtime = DockerRuntime::connect(None).await.unwrap();
        runtime.list(&ContainerFilter::default()).await.unwrap();
    }

    #[test]
    fn api_errors_keep_their_status_code() {
        let err: RuntimeError = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "no such container".to_string(),
        }
        .into();
        match err {
            RuntimeError::Api { code, message } => {
                assert_eq!(code, 404);
                assert!(message.contains("no such container"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
