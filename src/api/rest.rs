//! REST API Handlers
//!
//! Implements the REST surface: liveness, async status polling, and CRUD for
//! clusters, nodes, devices, and volumes. Mutating node/device/volume
//! operations run through the async tracker and answer 202 with a polling
//! location; deep operational semantics stay behind the executor/allocator
//! ports.

use crate::allocators::{AllocationRequest, AllocatorRef};
use crate::api::auth;
use crate::config::BrickLimits;
use crate::error::{Error, Result};
use crate::executors::ExecutorRef;
use crate::ops::{OpStatus, OpTracker};
use crate::store::{
    BrickEntry, ClusterEntry, DeviceEntry, MetaStore, NodeEntry, VolumeEntry, BRICK_TABLE,
    CLUSTER_TABLE, DEVICE_TABLE, NODE_TABLE, VOLUME_TABLE,
};
use axum::{
    extract::{Json, Path, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Node registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddRequest {
    pub cluster_id: String,
    pub hostname: String,
    #[serde(default = "default_zone")]
    pub zone: u32,
}

fn default_zone() -> u32 {
    1
}

/// Device registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAddRequest {
    pub node_id: String,
    /// Device path on the node (e.g. /dev/sdb)
    pub name: String,
    pub size_gb: u64,
}

/// Volume creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCreateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    pub size_gb: u64,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
}

fn default_replicas() -> u32 {
    1
}

/// Volume expansion request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeExpandRequest {
    pub expand_size_gb: u64,
}

/// Cluster info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    pub id: String,
    pub nodes: Vec<String>,
    pub volumes: Vec<String>,
}

/// Node info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub id: String,
    pub cluster_id: String,
    pub hostname: String,
    pub zone: u32,
    pub devices: Vec<String>,
}

/// Device info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub id: String,
    pub node_id: String,
    pub name: String,
    pub total_kb: u64,
    pub used_kb: u64,
    pub free_kb: u64,
    pub bricks: Vec<String>,
}

/// Volume info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub size_kb: u64,
    pub replicas: u32,
    pub bricks: Vec<String>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

// =============================================================================
// Router
// =============================================================================

/// Shared state for every handler: the already-validated environment built at
/// startup.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<MetaStore>,
    pub executor: ExecutorRef,
    pub allocator: AllocatorRef,
    pub ops: Arc<OpTracker>,
    pub limits: BrickLimits,
}

/// Build the route table. Pure mapping, no side effects.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/queue/:token", get(queue_status))
        // Cluster
        .route("/clusters", post(cluster_create).get(cluster_list))
        .route("/clusters/:id", get(cluster_info).delete(cluster_delete))
        // Node
        .route("/nodes", post(node_add).get(node_list))
        .route("/nodes/:id", get(node_info).delete(node_delete))
        // Device
        .route("/devices", post(device_add).get(device_list))
        .route("/devices/:id", get(device_info).delete(device_delete))
        // Volume
        .route("/volumes", post(volume_create).get(volume_list))
        .route("/volumes/:id", get(volume_info).delete(volume_delete))
        .route("/volumes/:id/expand", post(volume_expand))
        .layer(middleware::from_fn(auth::authorize))
        .with_state(state)
}

// =============================================================================
// Liveness & Async Status
// =============================================================================

async fn hello() -> impl IntoResponse {
    (StatusCode::OK, "Hello from the brickyard storage service")
}

/// Poll an async operation. Terminal reads consume the record.
async fn queue_status(State(state): State<ApiState>, Path(token): Path<String>) -> Response {
    if !valid_id(&token) {
        return not_found("operation", &token);
    }

    match state.ops.status(&token) {
        None => not_found("operation", &token),
        Some(OpStatus::Pending) => {
            let mut headers = HeaderMap::new();
            headers.insert("X-Pending", "true".parse().unwrap());
            (
                StatusCode::OK,
                headers,
                Json(serde_json::json!({"status": "pending"})),
            )
                .into_response()
        }
        Some(OpStatus::Completed(location)) => {
            state.ops.consume(&token);
            if location.is_empty() {
                StatusCode::NO_CONTENT.into_response()
            } else {
                match location.parse() {
                    Ok(value) => {
                        let mut headers = HeaderMap::new();
                        headers.insert(header::LOCATION, value);
                        (StatusCode::SEE_OTHER, headers).into_response()
                    }
                    Err(_) => internal_error(&Error::Internal(format!(
                        "invalid result location: {}",
                        location
                    ))),
                }
            }
        }
        Some(OpStatus::Failed(detail)) => {
            state.ops.consume(&token);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiErrorResponse {
                    error: "operation_failed".into(),
                    message: detail,
                }),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Cluster Handlers
// =============================================================================

async fn cluster_create(State(state): State<ApiState>) -> Response {
    let entry = ClusterEntry::new(generate_id());
    info!("Creating cluster {}", entry.id);

    if let Err(e) = state.store.put(CLUSTER_TABLE, &entry.id, &entry) {
        return internal_error(&e);
    }

    (
        StatusCode::CREATED,
        Json(ClusterResponse {
            id: entry.id,
            nodes: entry.nodes,
            volumes: entry.volumes,
        }),
    )
        .into_response()
}

async fn cluster_info(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("cluster", &id);
    }

    match state.store.get::<ClusterEntry>(CLUSTER_TABLE, &id) {
        Ok(Some(entry)) => (
            StatusCode::OK,
            Json(ClusterResponse {
                id: entry.id,
                nodes: entry.nodes,
                volumes: entry.volumes,
            }),
        )
            .into_response(),
        Ok(None) => not_found("cluster", &id),
        Err(e) => internal_error(&e),
    }
}

async fn cluster_list(State(state): State<ApiState>) -> Response {
    match state.store.list_ids(CLUSTER_TABLE) {
        Ok(ids) => (StatusCode::OK, Json(serde_json::json!({ "clusters": ids }))).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn cluster_delete(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("cluster", &id);
    }

    let entry = match state.store.get::<ClusterEntry>(CLUSTER_TABLE, &id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found("cluster", &id),
        Err(e) => return internal_error(&e),
    };

    if !entry.nodes.is_empty() || !entry.volumes.is_empty() {
        return conflict("cluster is not empty");
    }

    match state.store.delete(CLUSTER_TABLE, &id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal_error(&e),
    }
}

// =============================================================================
// Node Handlers
// =============================================================================

async fn node_add(
    State(state): State<ApiState>,
    Json(request): Json<NodeAddRequest>,
) -> Response {
    if request.hostname.is_empty() {
        return bad_request("hostname is required");
    }
    if !valid_id(&request.cluster_id) {
        return not_found("cluster", &request.cluster_id);
    }
    match state.store.get::<ClusterEntry>(CLUSTER_TABLE, &request.cluster_id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("cluster", &request.cluster_id),
        Err(e) => return internal_error(&e),
    }

    let entry = NodeEntry {
        id: generate_id(),
        cluster_id: request.cluster_id,
        hostname: request.hostname,
        zone: request.zone,
        devices: Vec::new(),
        created_at: chrono::Utc::now(),
    };

    let token = state.ops.enqueue(node_add_work(state.clone(), entry));
    accepted(&token)
}

async fn node_add_work(state: ApiState, entry: NodeEntry) -> Result<String> {
    info!("Adding node {} ({})", entry.id, entry.hostname);

    state
        .executor
        .execute(&entry.hostname, &[format!("peer probe {}", entry.hostname)])
        .await?;

    state.store.put(NODE_TABLE, &entry.id, &entry)?;

    let mut cluster: ClusterEntry = state
        .store
        .get(CLUSTER_TABLE, &entry.cluster_id)?
        .ok_or(Error::NotFound {
            kind: "cluster",
            id: entry.cluster_id.clone(),
        })?;
    cluster.nodes.push(entry.id.clone());
    state.store.put(CLUSTER_TABLE, &cluster.id, &cluster)?;

    Ok(format!("/nodes/{}", entry.id))
}

async fn node_info(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("node", &id);
    }

    match state.store.get::<NodeEntry>(NODE_TABLE, &id) {
        Ok(Some(entry)) => (
            StatusCode::OK,
            Json(NodeResponse {
                id: entry.id,
                cluster_id: entry.cluster_id,
                hostname: entry.hostname,
                zone: entry.zone,
                devices: entry.devices,
            }),
        )
            .into_response(),
        Ok(None) => not_found("node", &id),
        Err(e) => internal_error(&e),
    }
}

async fn node_list(State(state): State<ApiState>) -> Response {
    match state.store.list_ids(NODE_TABLE) {
        Ok(ids) => (StatusCode::OK, Json(serde_json::json!({ "nodes": ids }))).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn node_delete(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("node", &id);
    }

    let entry = match state.store.get::<NodeEntry>(NODE_TABLE, &id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found("node", &id),
        Err(e) => return internal_error(&e),
    };
    if !entry.devices.is_empty() {
        return conflict("node still has devices");
    }

    let token = state.ops.enqueue(node_delete_work(state.clone(), entry));
    accepted(&token)
}

async fn node_delete_work(state: ApiState, entry: NodeEntry) -> Result<String> {
    info!("Removing node {} ({})", entry.id, entry.hostname);

    state
        .executor
        .execute(&entry.hostname, &[format!("peer detach {}", entry.hostname)])
        .await?;

    if let Some(mut cluster) = state
        .store
        .get::<ClusterEntry>(CLUSTER_TABLE, &entry.cluster_id)?
    {
        cluster.nodes.retain(|n| n != &entry.id);
        state.store.put(CLUSTER_TABLE, &cluster.id, &cluster)?;
    }
    state.store.delete(NODE_TABLE, &entry.id)?;

    Ok(String::new())
}

// =============================================================================
// Device Handlers
// =============================================================================

async fn device_add(
    State(state): State<ApiState>,
    Json(request): Json<DeviceAddRequest>,
) -> Response {
    if request.name.is_empty() {
        return bad_request("device name is required");
    }
    if request.size_gb == 0 {
        return bad_request("device size must be positive");
    }
    if !valid_id(&request.node_id) {
        return not_found("node", &request.node_id);
    }
    let node = match state.store.get::<NodeEntry>(NODE_TABLE, &request.node_id) {
        Ok(Some(node)) => node,
        Ok(None) => return not_found("node", &request.node_id),
        Err(e) => return internal_error(&e),
    };

    let entry = DeviceEntry {
        id: generate_id(),
        node_id: request.node_id,
        name: request.name,
        total_kb: request.size_gb * 1024 * 1024,
        used_kb: 0,
        bricks: Vec::new(),
    };

    let token = state.ops.enqueue(device_add_work(state.clone(), node, entry));
    accepted(&token)
}

async fn device_add_work(state: ApiState, mut node: NodeEntry, entry: DeviceEntry) -> Result<String> {
    info!("Adding device {} on node {}", entry.name, node.id);

    state
        .executor
        .execute(&node.hostname, &[format!("pvcreate {}", entry.name)])
        .await?;

    state.store.put(DEVICE_TABLE, &entry.id, &entry)?;
    node.devices.push(entry.id.clone());
    state.store.put(NODE_TABLE, &node.id, &node)?;

    Ok(format!("/devices/{}", entry.id))
}

async fn device_info(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("device", &id);
    }

    match state.store.get::<DeviceEntry>(DEVICE_TABLE, &id) {
        Ok(Some(entry)) => {
            let free_kb = entry.free_kb();
            (
                StatusCode::OK,
                Json(DeviceResponse {
                    id: entry.id,
                    node_id: entry.node_id,
                    name: entry.name,
                    total_kb: entry.total_kb,
                    used_kb: entry.used_kb,
                    free_kb,
                    bricks: entry.bricks,
                }),
            )
                .into_response()
        }
        Ok(None) => not_found("device", &id),
        Err(e) => internal_error(&e),
    }
}

async fn device_list(State(state): State<ApiState>) -> Response {
    match state.store.list_ids(DEVICE_TABLE) {
        Ok(ids) => (StatusCode::OK, Json(serde_json::json!({ "devices": ids }))).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn device_delete(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("device", &id);
    }

    let entry = match state.store.get::<DeviceEntry>(DEVICE_TABLE, &id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found("device", &id),
        Err(e) => return internal_error(&e),
    };
    if !entry.bricks.is_empty() {
        return conflict("device still holds bricks");
    }

    let token = state.ops.enqueue(device_delete_work(state.clone(), entry));
    accepted(&token)
}

async fn device_delete_work(state: ApiState, entry: DeviceEntry) -> Result<String> {
    info!("Removing device {} from node {}", entry.id, entry.node_id);

    if let Some(node) = state.store.get::<NodeEntry>(NODE_TABLE, &entry.node_id)? {
        state
            .executor
            .execute(&node.hostname, &[format!("pvremove {}", entry.name)])
            .await?;

        let mut node = node;
        node.devices.retain(|d| d != &entry.id);
        state.store.put(NODE_TABLE, &node.id, &node)?;
    }
    state.store.delete(DEVICE_TABLE, &entry.id)?;

    Ok(String::new())
}

// =============================================================================
// Volume Handlers
// =============================================================================

async fn volume_create(
    State(state): State<ApiState>,
    Json(request): Json<VolumeCreateRequest>,
) -> Response {
    if request.size_gb == 0 {
        return bad_request("volume size must be positive");
    }

    if let Some(cluster_id) = &request.cluster_id {
        if !valid_id(cluster_id) {
            return not_found("cluster", cluster_id);
        }
        match state.store.get::<ClusterEntry>(CLUSTER_TABLE, cluster_id) {
            Ok(Some(_)) => {}
            Ok(None) => return not_found("cluster", cluster_id),
            Err(e) => return internal_error(&e),
        }
    }

    let size_kb = request.size_gb * 1024 * 1024;
    let (brick_size_kb, brick_count) =
        match brick_layout(size_kb, request.replicas, &state.limits) {
            Ok(layout) => layout,
            Err(e) => return bad_request(&e.to_string()),
        };

    let id = generate_id();
    let entry = VolumeEntry {
        name: request.name.unwrap_or_else(|| format!("vol_{}", id)),
        id,
        cluster_id: request.cluster_id.unwrap_or_default(),
        size_kb,
        replicas: request.replicas,
        bricks: Vec::new(),
        created_at: chrono::Utc::now(),
    };

    let token = state
        .ops
        .enqueue(volume_create_work(state.clone(), entry, brick_size_kb, brick_count));
    accepted(&token)
}

async fn volume_create_work(
    state: ApiState,
    mut entry: VolumeEntry,
    brick_size_kb: u64,
    brick_count: u32,
) -> Result<String> {
    info!(
        "Creating volume {} ({} KB, {} bricks)",
        entry.id, entry.size_kb, brick_count
    );

    let placement = state
        .allocator
        .allocate(&AllocationRequest {
            volume_id: entry.id.clone(),
            brick_size_kb,
            brick_count,
        })
        .await?;

    for placed in &placement.bricks {
        let brick = BrickEntry {
            id: generate_id(),
            volume_id: entry.id.clone(),
            device_id: placed.device_id.clone(),
            node_id: placed.node_id.clone(),
            size_kb: placed.size_kb,
            path: format!("/var/lib/brickyard/{}/brick_{}", entry.id, entry.bricks.len()),
        };

        let host = match state.store.get::<NodeEntry>(NODE_TABLE, &placed.node_id)? {
            Some(node) => node.hostname,
            None => placed.node_id.clone(),
        };
        state
            .executor
            .execute(&host, &[format!("mkdir -p {}", brick.path)])
            .await?;

        if let Some(mut device) = state
            .store
            .get::<DeviceEntry>(DEVICE_TABLE, &placed.device_id)?
        {
            device.used_kb += placed.size_kb;
            device.bricks.push(brick.id.clone());
            state.store.put(DEVICE_TABLE, &device.id, &device)?;
        }

        state.store.put(BRICK_TABLE, &brick.id, &brick)?;
        entry.bricks.push(brick.id);
    }

    state.store.put(VOLUME_TABLE, &entry.id, &entry)?;

    if !entry.cluster_id.is_empty() {
        if let Some(mut cluster) = state
            .store
            .get::<ClusterEntry>(CLUSTER_TABLE, &entry.cluster_id)?
        {
            cluster.volumes.push(entry.id.clone());
            state.store.put(CLUSTER_TABLE, &cluster.id, &cluster)?;
        }
    }

    Ok(format!("/volumes/{}", entry.id))
}

async fn volume_info(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("volume", &id);
    }

    match state.store.get::<VolumeEntry>(VOLUME_TABLE, &id) {
        Ok(Some(entry)) => (
            StatusCode::OK,
            Json(VolumeResponse {
                id: entry.id,
                cluster_id: entry.cluster_id,
                name: entry.name,
                size_kb: entry.size_kb,
                replicas: entry.replicas,
                bricks: entry.bricks,
            }),
        )
            .into_response(),
        Ok(None) => not_found("volume", &id),
        Err(e) => internal_error(&e),
    }
}

async fn volume_list(State(state): State<ApiState>) -> Response {
    match state.store.list_ids(VOLUME_TABLE) {
        Ok(ids) => (StatusCode::OK, Json(serde_json::json!({ "volumes": ids }))).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn volume_expand(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<VolumeExpandRequest>,
) -> Response {
    if !valid_id(&id) {
        return not_found("volume", &id);
    }
    if request.expand_size_gb == 0 {
        return bad_request("expansion size must be positive");
    }

    let entry = match state.store.get::<VolumeEntry>(VOLUME_TABLE, &id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found("volume", &id),
        Err(e) => return internal_error(&e),
    };

    let expand_kb = request.expand_size_gb * 1024 * 1024;
    let (brick_size_kb, brick_count) =
        match brick_layout(expand_kb, entry.replicas, &state.limits) {
            Ok(layout) => layout,
            Err(e) => return bad_request(&e.to_string()),
        };

    let token = state
        .ops
        .enqueue(volume_expand_work(state.clone(), entry, expand_kb, brick_size_kb, brick_count));
    accepted(&token)
}

async fn volume_expand_work(
    state: ApiState,
    mut entry: VolumeEntry,
    expand_kb: u64,
    brick_size_kb: u64,
    brick_count: u32,
) -> Result<String> {
    info!("Expanding volume {} by {} KB", entry.id, expand_kb);

    let placement = state
        .allocator
        .allocate(&AllocationRequest {
            volume_id: entry.id.clone(),
            brick_size_kb,
            brick_count,
        })
        .await?;

    for placed in &placement.bricks {
        let brick = BrickEntry {
            id: generate_id(),
            volume_id: entry.id.clone(),
            device_id: placed.device_id.clone(),
            node_id: placed.node_id.clone(),
            size_kb: placed.size_kb,
            path: format!("/var/lib/brickyard/{}/brick_{}", entry.id, entry.bricks.len()),
        };

        let host = match state.store.get::<NodeEntry>(NODE_TABLE, &placed.node_id)? {
            Some(node) => node.hostname,
            None => placed.node_id.clone(),
        };
        state
            .executor
            .execute(&host, &[format!("mkdir -p {}", brick.path)])
            .await?;

        if let Some(mut device) = state
            .store
            .get::<DeviceEntry>(DEVICE_TABLE, &placed.device_id)?
        {
            device.used_kb += placed.size_kb;
            device.bricks.push(brick.id.clone());
            state.store.put(DEVICE_TABLE, &device.id, &device)?;
        }

        state.store.put(BRICK_TABLE, &brick.id, &brick)?;
        entry.bricks.push(brick.id);
    }

    entry.size_kb += expand_kb;
    state.store.put(VOLUME_TABLE, &entry.id, &entry)?;

    Ok(format!("/volumes/{}", entry.id))
}

async fn volume_delete(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !valid_id(&id) {
        return not_found("volume", &id);
    }

    let entry = match state.store.get::<VolumeEntry>(VOLUME_TABLE, &id) {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found("volume", &id),
        Err(e) => return internal_error(&e),
    };

    let token = state.ops.enqueue(volume_delete_work(state.clone(), entry));
    accepted(&token)
}

async fn volume_delete_work(state: ApiState, entry: VolumeEntry) -> Result<String> {
    info!("Deleting volume {}", entry.id);

    for brick_id in &entry.bricks {
        let brick = match state.store.get::<BrickEntry>(BRICK_TABLE, brick_id)? {
            Some(brick) => brick,
            None => continue,
        };

        if let Some(node) = state.store.get::<NodeEntry>(NODE_TABLE, &brick.node_id)? {
            state
                .executor
                .execute(&node.hostname, &[format!("rm -rf {}", brick.path)])
                .await?;
        }

        if let Some(mut device) = state
            .store
            .get::<DeviceEntry>(DEVICE_TABLE, &brick.device_id)?
        {
            device.used_kb = device.used_kb.saturating_sub(brick.size_kb);
            device.bricks.retain(|b| b != brick_id);
            state.store.put(DEVICE_TABLE, &device.id, &device)?;
        }

        state.store.delete(BRICK_TABLE, brick_id)?;
    }

    if !entry.cluster_id.is_empty() {
        if let Some(mut cluster) = state
            .store
            .get::<ClusterEntry>(CLUSTER_TABLE, &entry.cluster_id)?
        {
            cluster.volumes.retain(|v| v != &entry.id);
            state.store.put(CLUSTER_TABLE, &cluster.id, &cluster)?;
        }
    }

    state.store.delete(VOLUME_TABLE, &entry.id)?;

    Ok(String::new())
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Fresh 32-character hex id
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Ids and tokens are constrained to non-empty hex strings
fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Split a volume into bricks within the configured bounds.
///
/// Returns (brick size, total brick count including replicas).
fn brick_layout(size_kb: u64, replicas: u32, limits: &BrickLimits) -> Result<(u64, u32)> {
    if replicas == 0 {
        return Err(Error::Validation("replica count must be positive".into()));
    }
    if size_kb < limits.min_brick_size_kb {
        return Err(Error::Validation(format!(
            "volume size {} KB is below the minimum brick size {} KB",
            size_kb, limits.min_brick_size_kb
        )));
    }

    let sets = size_kb.div_ceil(limits.max_brick_size_kb).max(1);
    let brick_size_kb = size_kb.div_ceil(sets);
    let total = sets * u64::from(replicas);
    if total > u64::from(limits.max_bricks_per_volume) {
        return Err(Error::Validation(format!(
            "volume requires {} bricks, limit is {}",
            total, limits.max_bricks_per_volume
        )));
    }

    Ok((brick_size_kb, total as u32))
}

fn accepted(token: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, format!("/queue/{}", token).parse().unwrap());
    headers.insert("X-Pending", "true".parse().unwrap());
    (StatusCode::ACCEPTED, headers).into_response()
}

fn not_found(kind: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse {
            error: "not_found".into(),
            message: format!("{} {} not found", kind, id),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse {
            error: "validation".into(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn conflict(message: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(ApiErrorResponse {
            error: "conflict".into(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(err: &Error) -> Response {
    error!("Request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiErrorResponse {
            error: err.kind().into(),
            message: err.to_string(),
        }),
    )
        .into_response()
}
