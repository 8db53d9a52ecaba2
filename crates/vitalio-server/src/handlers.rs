//! Generic CRUD handlers shared by every registered resource type.
//!
//! Handlers are parameterized by the resource-type name supplied at route
//! registration; there is no per-type code here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use vitalio_storage::DynRecordStorage;

use crate::api::ApiError;

/// Shared state for the request pipeline.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynRecordStorage,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Vitalio Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub(crate) async fn create_record(
    state: AppState,
    resource_type: String,
    payload: Value,
) -> Result<Response, ApiError> {
    check_body_type(&resource_type, &payload)?;
    let stored = state.storage.create(&payload).await?;
    tracing::debug!(
        resource_type = %stored.resource_type,
        id = %stored.id,
        "Record created"
    );
    Ok((StatusCode::CREATED, Json(stored.resource)).into_response())
}

pub(crate) async fn read_record(
    state: AppState,
    resource_type: String,
    id: String,
) -> Result<Response, ApiError> {
    let record = state
        .storage
        .read(&resource_type, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{resource_type}/{id}")))?;
    Ok((StatusCode::OK, Json(record.resource)).into_response())
}

pub(crate) async fn update_record(
    state: AppState,
    resource_type: String,
    id: String,
    mut payload: Value,
) -> Result<Response, ApiError> {
    check_body_type(&resource_type, &payload)?;
    match payload.get("id").and_then(Value::as_str) {
        Some(body_id) if body_id != id => {
            return Err(ApiError::bad_request(format!(
                "Body id '{body_id}' does not match request path id '{id}'"
            )));
        }
        Some(_) => {}
        None => {
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("id".to_string(), json!(id));
            }
        }
    }
    let stored = state.storage.update(&payload).await?;
    tracing::debug!(
        resource_type = %stored.resource_type,
        id = %stored.id,
        version = %stored.version_id,
        "Record updated"
    );
    Ok((StatusCode::OK, Json(stored.resource)).into_response())
}

pub(crate) async fn delete_record(
    state: AppState,
    resource_type: String,
    id: String,
) -> Result<Response, ApiError> {
    state.storage.delete(&resource_type, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn check_body_type(resource_type: &str, payload: &Value) -> Result<(), ApiError> {
    let body_type = payload
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if body_type != resource_type {
        return Err(ApiError::bad_request(format!(
            "Body resourceType '{body_type}' does not match request path type '{resource_type}'"
        )));
    }
    Ok(())
}
