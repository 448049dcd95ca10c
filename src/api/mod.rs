//! HTTP surface.
//!
//! Thin JSON routing over the pool core. The route table mirrors the
//! `/container_group` hierarchy:
//!
//! ```text
//! POST   /container_group/:group                        declare group
//! GET    /container_group/:group                        group config
//! PUT    /container_group/:group                        update bounds/spec
//! DELETE /container_group/:group                        tear down + evict
//! GET    /container_group                               group identifiers
//! GET    /container_group/:group/container[?state=..]   list containers
//! POST   /container_group/:group/container              create container
//! GET    /container_group/:group/container/:id          inspect
//! DELETE /container_group/:group/container/:id          tear down
//! POST   /container_group/:group/container/:id/start    start
//! POST   /container_group/:group/container/:id/stop     stop
//! POST   /container_group/:group/container/:id/exec     run command
//! POST   /container_group/:group/set_running_container  reconcile running
//! POST   /container_group/:group/set_available_container reconcile available
//! ```
//!
//! Failures are reported as `{"message", "error_type"}` with the status code
//! mapping from [`error`].

pub mod error;
pub mod handlers;

use crate::pool::ContainerPool;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::{get, post, Endpoint, EndpointExt, Route, Server};
use std::sync::Arc;
use tracing::info;

pub use error::ErrorBody;

/// Build the route table over a pool.
pub fn routes(pool: Arc<ContainerPool>) -> impl Endpoint {
    Route::new()
        .at("/container_group", get(handlers::list_groups))
        .at(
            "/container_group/:group",
            post(handlers::add_group)
                .get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .at(
            "/container_group/:group/container",
            get(handlers::list_containers).post(handlers::create_container),
        )
        .at(
            "/container_group/:group/container/:container",
            get(handlers::get_container).delete(handlers::remove_container),
        )
        .at(
            "/container_group/:group/container/:container/start",
            post(handlers::start_container),
        )
        .at(
            "/container_group/:group/container/:container/stop",
            post(handlers::stop_container),
        )
        .at(
            "/container_group/:group/container/:container/exec",
            post(handlers::exec_command),
        )
        .at(
            "/container_group/:group/set_running_container",
            post(handlers::set_running_count),
        )
        .at(
            "/container_group/:group/set_available_container",
            post(handlers::set_available_count),
        )
        .data(pool)
        .with(Tracing)
}

/// Serve the API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(pool: Arc<ContainerPool>, addr: &str) -> std::io::Result<()> {
    info!("starting HTTP API server on {addr}");
    Server::new(TcpListener::bind(addr.to_string()))
        .run(routes(pool))
        .await
}
