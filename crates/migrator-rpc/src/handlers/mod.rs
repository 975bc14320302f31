//! JSON-RPC request handlers.

mod migrations;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use release_migrator::{MigratorError, ResourceId, ResourceSpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> release_migrator::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| MigratorError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract the `id` parameter as a `<namespace>/<name>` resource id.
pub(crate) fn require_id_param(params: &Value) -> release_migrator::Result<ResourceId> {
    require_str_param(params, "id", "id")?.parse()
}

/// Extract the `spec` object parameter.
pub(crate) fn require_spec_param(params: &Value) -> release_migrator::Result<ResourceSpec> {
    let spec = params
        .get("spec")
        .ok_or_else(|| MigratorError::InvalidParams {
            message: "Missing required parameter: spec".to_string(),
        })?;
    serde_json::from_value(spec.clone()).map_err(|e| MigratorError::InvalidParams {
        message: format!("Invalid spec: {}", e),
    })
}

/// Structured error details clients can act on without parsing messages.
fn error_data(err: &MigratorError) -> Option<Value> {
    match err {
        MigratorError::ReplacementRequired { fields } => Some(json!({ "fields": fields })),
        MigratorError::Probe { store, .. } => Some(json!({
            "store": store.as_str(),
            "retryable": err.is_retryable(),
        })),
        _ => None,
    }
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(
                    id,
                    e.to_rpc_error_code(),
                    e.to_string(),
                    error_data(&e),
                )),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> release_migrator::Result<Value> {
    match method {
        "migration_create" => migrations::migration_create(state, params).await,
        "migration_read" => migrations::migration_read(state, params).await,
        "migration_update" => migrations::migration_update(state, params).await,
        "migration_delete" => migrations::migration_delete(state, params).await,
        "migration_exists" => migrations::migration_exists(state, params).await,
        "migration_import" => migrations::migration_import(state, params).await,
        "migration_list" => migrations::migration_list(state, params).await,
        "migration_cancel" => migrations::migration_cancel(state, params).await,

        _ => {
            warn!("Unknown RPC method: {}", method);
            Err(MigratorError::MethodNotFound {
                method: method.to_string(),
            })
        }
    }
}
