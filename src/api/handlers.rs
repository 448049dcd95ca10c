//! Route handlers.
//!
//! Thin pass-through from JSON requests to [`ContainerPool`] /
//! [`ContainerGroup`] calls; all real semantics live in the pool core.

use crate::pool::{
    ContainerPool, GroupConfig, GroupSpec, PoolError, SpecOverrides, TeardownReport,
};
use crate::runtime::{ContainerHandle, ContainerState, ExecOutput};
use poem::handler;
use poem::web::{Data, Json, Path, Query};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AddGroupRequest {
    #[serde(flatten)]
    pub config: GroupConfig,
    /// Pull the spec image eagerly before registering the group.
    #[serde(default)]
    pub update_image: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroupRequest {
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
    pub specs: Option<GroupSpec>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateContainerRequest {
    #[serde(default = "default_true")]
    pub start: bool,
    #[serde(default)]
    pub specs: Option<SpecOverrides>,
}

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct CountRequest {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListContainersQuery {
    /// Comma-separated lifecycle states, e.g. `created,exited`.
    pub state: Option<String>,
}

fn parse_states(raw: Option<&str>) -> Result<Vec<ContainerState>, PoolError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match ContainerState::parse(s) {
            ContainerState::Unknown => Err(PoolError::InvalidRequest(format!(
                "unknown container state: {s:?}"
            ))),
            state => Ok(state),
        })
        .collect()
}

#[handler]
pub async fn list_groups(Data(pool): Data<&Arc<ContainerPool>>) -> Json<Vec<String>> {
    Json(pool.group_identifiers().await)
}

#[handler]
pub async fn add_group(
    Path(group): Path<String>,
    Json(request): Json<AddGroupRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<GroupConfig>> {
    let group = pool
        .add_group(&group, request.config, request.update_image)
        .await?;
    Ok(Json(group.config().await))
}

#[handler]
pub async fn get_group(
    Path(group): Path<String>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<GroupConfig>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.config().await))
}

#[handler]
pub async fn update_group(
    Path(group): Path<String>,
    Json(request): Json<UpdateGroupRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<GroupConfig>> {
    let group = pool.get_group(&group).await?;
    let updated = group
        .update_config(request.min_count, request.max_count, request.specs)
        .await?;
    Ok(Json(updated))
}

#[handler]
pub async fn delete_group(
    Path(group): Path<String>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<Vec<TeardownReport>>> {
    Ok(Json(pool.delete_group(&group).await?))
}

#[handler]
pub async fn list_containers(
    Path(group): Path<String>,
    Query(query): Query<ListContainersQuery>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<Vec<ContainerHandle>>> {
    let states = parse_states(query.state.as_deref())?;
    let group = pool.get_group(&group).await?;
    Ok(Json(group.list(&states).await?))
}

#[handler]
pub async fn create_container(
    Path(group): Path<String>,
    Json(request): Json<CreateContainerRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<ContainerHandle>> {
    let group = pool.get_group(&group).await?;
    let handle = group.create(request.start, request.specs.as_ref()).await?;
    Ok(Json(handle))
}

#[handler]
pub async fn get_container(
    Path((group, container)): Path<(String, String)>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<ContainerHandle>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.get(&container).await?))
}

#[handler]
pub async fn remove_container(
    Path((group, container)): Path<(String, String)>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<TeardownReport>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.remove(&container).await?))
}

#[handler]
pub async fn start_container(
    Path((group, container)): Path<(String, String)>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<ContainerHandle>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.start(&container).await?))
}

#[handler]
pub async fn stop_container(
    Path((group, container)): Path<(String, String)>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<ContainerHandle>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.stop(&container).await?))
}

#[handler]
pub async fn exec_command(
    Path((group, container)): Path<(String, String)>,
    Json(request): Json<ExecRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<Json<ExecOutput>> {
    let group = pool.get_group(&group).await?;
    Ok(Json(group.exec(&container, &request.command).await?))
}

#[handler]
pub async fn set_running_count(
    Path(group): Path<String>,
    Json(request): Json<CountRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<()> {
    let group = pool.get_group(&group).await?;
    group.set_running_count(request.count).await?;
    Ok(())
}

#[handler]
pub async fn set_available_count(
    Path(group): Path<String>,
    Json(request): Json<CountRequest>,
    Data(pool): Data<&Arc<ContainerPool>>,
) -> poem::Result<()> {
    let group = pool.get_group(&group).await?;
    group.set_available_count(request.count).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_group_request_flattens_config() {
        let request: AddGroupRequest = serde_json::from_value(json!({
            "min_count": 1,
            "max_count": 5,
            "specs": {"image": "redis", "command": ""},
            "update_image": true
        }))
        .unwrap();
        assert_eq!(request.config.min_count, 1);
        assert_eq!(request.config.max_count, Some(5));
        assert_eq!(request.config.spec.image, "redis");
        assert!(request.update_image);
    }

    #[test]
    fn add_group_request_minimal_body() {
        let request: AddGroupRequest =
            serde_json::from_value(json!({"specs": {"image": "redis"}})).unwrap();
        assert_eq!(request.config.min_count, 0);
        assert_eq!(request.config.max_count, None);
        assert!(!request.update_image);
    }

    #[test]
    fn create_container_defaults_to_start() {
        let request: CreateContainerRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.start);
        assert!(request.specs.is_none());

        let request: CreateContainerRequest =
            serde_json::from_value(json!({"start": false})).unwrap();
        assert!(!request.start);
    }

    #[test]
    fn states_parse_from_comma_list() {
        let states = parse_states(Some("created, exited")).unwrap();
        assert_eq!(
            states,
            vec![ContainerState::Created, ContainerState::Exited]
        );
        assert!(parse_states(None).unwrap().is_empty());
        assert!(parse_states(Some("frozen")).is_err());
    }
}
