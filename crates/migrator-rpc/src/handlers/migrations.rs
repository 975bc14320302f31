//! Migration resource lifecycle handlers.

use super::{require_id_param, require_spec_param, require_str_param};
use crate::server::AppState;
use serde_json::{json, Value};

pub async fn migration_create(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let spec = require_spec_param(params)?;
    let resource = state.api.create(spec).await?;
    Ok(serde_json::to_value(resource)?)
}

pub async fn migration_read(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_id_param(params)?;
    let resource = state.api.read(&id).await?;
    Ok(serde_json::to_value(resource)?)
}

pub async fn migration_update(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_id_param(params)?;
    let spec = require_spec_param(params)?;
    let resource = state.api.update(&id, spec).await?;
    Ok(serde_json::to_value(resource)?)
}

pub async fn migration_delete(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_id_param(params)?;
    let removed = state.api.delete(&id).await?;
    Ok(json!({ "removed": removed }))
}

pub async fn migration_exists(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_id_param(params)?;
    let exists = state.api.exists(&id).await?;
    Ok(json!({ "exists": exists }))
}

/// Adopt an existing release; `id` is `<namespace>/<name>`.
pub async fn migration_import(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_str_param(params, "id", "id")?;
    let resource = state.api.import(&id).await?;
    Ok(serde_json::to_value(resource)?)
}

pub async fn migration_list(state: &AppState, _params: &Value) -> release_migrator::Result<Value> {
    let resources = state.api.list()?;
    Ok(serde_json::to_value(resources)?)
}

pub async fn migration_cancel(state: &AppState, params: &Value) -> release_migrator::Result<Value> {
    let id = require_id_param(params)?;
    let cancelled = state.api.cancel_pass(&id);
    Ok(json!({ "cancelled": cancelled }))
}
