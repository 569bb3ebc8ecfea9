//! Management client - Interface to the Azure Resource Manager API
//!
//! Every resource is addressed by its resource ID. Mutating calls start a
//! long-running operation and return a handle that is polled with
//! [`ManagementClient::operation_status`] (see [`crate::poller`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use nimbus_core::provider::BoxFuture;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("resource {0} was not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Handle of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub operation_id: String,
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
    Canceled,
}

pub trait ManagementClient: Send + Sync {
    /// Fetch the resource body
    fn get(&self, id: &str, api_version: &str) -> BoxFuture<'_, ClientResult<JsonValue>>;

    /// PUT the full resource body
    fn begin_create_or_update(
        &self,
        id: &str,
        api_version: &str,
        body: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>>;

    /// PATCH the resource with a merge patch
    fn begin_update(
        &self,
        id: &str,
        api_version: &str,
        patch: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>>;

    fn begin_delete(&self, id: &str, api_version: &str)
    -> BoxFuture<'_, ClientResult<OperationHandle>>;

    /// POST an action on the resource (`{id}/{action}`)
    fn begin_post(
        &self,
        id: &str,
        action: &str,
        api_version: &str,
        body: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>>;

    fn operation_status(
        &self,
        handle: &OperationHandle,
    ) -> BoxFuture<'_, ClientResult<OperationStatus>>;
}

// =============================================================================
// In-memory client
// =============================================================================

/// A call received by [`InMemoryClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub id: String,
    pub body: Option<JsonValue>,
}

#[derive(Debug)]
struct PendingOperation {
    remaining_polls: u32,
    outcome: OperationStatus,
}

/// Management API simulated in memory.
///
/// Resource IDs are compared case-insensitively, as ARM does. Stored bodies
/// carry `id`, `name` and `type` like real responses.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    resources: RwLock<HashMap<String, JsonValue>>,
    operations: Mutex<HashMap<String, PendingOperation>>,
    calls: Mutex<Vec<RecordedCall>>,
    failing: RwLock<HashMap<String, String>>,
    pending_polls: u32,
    next_operation: AtomicU64,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every operation as in progress for `polls` polls before it completes
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Store a resource body as if it had been created out of band
    pub async fn insert(&self, id: &str, body: JsonValue) {
        let body = with_envelope(id, body);
        self.resources.write().await.insert(key(id), body);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.resources.read().await.contains_key(&key(id))
    }

    /// Make operations on `id` end in `Failed(message)`
    pub async fn fail_operations_on(&self, id: &str, message: impl Into<String>) {
        self.failing.write().await.insert(key(id), message.into());
    }

    /// Calls received so far, oldest first
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, method: &'static str, id: &str, body: Option<&JsonValue>) {
        self.calls.lock().await.push(RecordedCall {
            method,
            id: id.to_string(),
            body: body.cloned(),
        });
    }

    async fn start_operation(&self, resource_id: &str) -> OperationHandle {
        let n = self.next_operation.fetch_add(1, Ordering::Relaxed);
        let operation_id = format!("operation-{}", n);
        let outcome = match self.failing.read().await.get(&key(resource_id)) {
            Some(message) => OperationStatus::Failed(message.clone()),
            None => OperationStatus::Succeeded,
        };
        self.operations.lock().await.insert(
            operation_id.clone(),
            PendingOperation {
                remaining_polls: self.pending_polls,
                outcome,
            },
        );
        OperationHandle {
            operation_id,
            resource_id: resource_id.to_string(),
        }
    }
}

impl ManagementClient for InMemoryClient {
    fn get(&self, id: &str, _api_version: &str) -> BoxFuture<'_, ClientResult<JsonValue>> {
        let id = id.to_string();
        Box::pin(async move {
            self.record("GET", &id, None).await;
            self.resources
                .read()
                .await
                .get(&key(&id))
                .cloned()
                .ok_or(ClientError::NotFound(id))
        })
    }

    fn begin_create_or_update(
        &self,
        id: &str,
        _api_version: &str,
        body: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>> {
        let id = id.to_string();
        Box::pin(async move {
            self.record("PUT", &id, Some(&body)).await;
            let body = with_envelope(&id, body);
            self.resources.write().await.insert(key(&id), body);
            Ok(self.start_operation(&id).await)
        })
    }

    fn begin_update(
        &self,
        id: &str,
        _api_version: &str,
        patch: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>> {
        let id = id.to_string();
        Box::pin(async move {
            self.record("PATCH", &id, Some(&patch)).await;
            {
                let mut resources = self.resources.write().await;
                let existing = resources
                    .get_mut(&key(&id))
                    .ok_or_else(|| ClientError::NotFound(id.clone()))?;
                merge_patch(existing, &patch);
            }
            Ok(self.start_operation(&id).await)
        })
    }

    fn begin_delete(
        &self,
        id: &str,
        _api_version: &str,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>> {
        let id = id.to_string();
        Box::pin(async move {
            self.record("DELETE", &id, None).await;
            if self.resources.write().await.remove(&key(&id)).is_none() {
                return Err(ClientError::NotFound(id));
            }
            Ok(self.start_operation(&id).await)
        })
    }

    fn begin_post(
        &self,
        id: &str,
        action: &str,
        _api_version: &str,
        body: JsonValue,
    ) -> BoxFuture<'_, ClientResult<OperationHandle>> {
        let target = format!("{}/{}", id, action);
        let id = id.to_string();
        Box::pin(async move {
            self.record("POST", &target, Some(&body)).await;
            if !self.contains(&id).await {
                return Err(ClientError::NotFound(id));
            }
            Ok(self.start_operation(&id).await)
        })
    }

    fn operation_status(
        &self,
        handle: &OperationHandle,
    ) -> BoxFuture<'_, ClientResult<OperationStatus>> {
        let operation_id = handle.operation_id.clone();
        Box::pin(async move {
            let mut operations = self.operations.lock().await;
            let operation = operations.get_mut(&operation_id).ok_or_else(|| ClientError::Api {
                status: 404,
                message: format!("unknown operation {}", operation_id),
            })?;
            if operation.remaining_polls > 0 {
                operation.remaining_polls -= 1;
                return Ok(OperationStatus::InProgress);
            }
            // Finished operations are reported once
            let outcome = operation.outcome.clone();
            operations.remove(&operation_id);
            Ok(outcome)
        })
    }
}

fn key(id: &str) -> String {
    id.trim_end_matches('/').to_ascii_lowercase()
}

/// Add `id`, `name` and `type` to a body the way ARM responses carry them
fn with_envelope(id: &str, body: JsonValue) -> JsonValue {
    let mut body = match body {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    body.insert("id".to_string(), JsonValue::from(id));
    if let Some(name) = id.rsplit('/').next() {
        body.insert("name".to_string(), JsonValue::from(name));
    }
    if let Some(resource_type) = resource_type_of(id) {
        body.insert("type".to_string(), JsonValue::from(resource_type));
    }
    JsonValue::Object(body)
}

/// `.../providers/Microsoft.Network/networkManagers/nm/networkGroups/ng`
/// -> `Microsoft.Network/networkManagers/networkGroups`
fn resource_type_of(id: &str) -> Option<String> {
    let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
    let providers = segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("providers"))?;
    let namespace = segments.get(providers + 1)?;
    let types: Vec<&str> = segments[providers + 2..].iter().step_by(2).copied().collect();
    if types.is_empty() {
        return None;
    }
    Some(format!("{}/{}", namespace, types.join("/")))
}

/// JSON merge patch: objects merge recursively, `null` removes a key
fn merge_patch(target: &mut JsonValue, patch: &JsonValue) {
    let JsonValue::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = JsonValue::Object(serde_json::Map::new());
    }
    if let JsonValue::Object(target) = target {
        for (k, v) in patch {
            if v.is_null() {
                target.remove(k);
            } else {
                merge_patch(target.entry(k.clone()).or_insert(JsonValue::Null), v);
            }
        }
    }
}
