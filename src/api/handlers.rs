use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::logic::{ExpandError, Expander, StoreResolver};
use crate::model::{InstancetypeTemplate, Metadata, PreferenceTemplate, VirtualMachine};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Structured failure status returned by every endpoint: an error kind, a
/// human-readable message, and for conflicts the offending field paths.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    WrongType,
    ValidationError,
    NotFound,
    Conflict,
    InternalError,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            error: message.to_string(),
            conflicts: None,
        }
    }
}

fn error(status: StatusCode, kind: ErrorKind, message: &str) -> ApiError {
    (status, Json(ErrorResponse::new(kind, message)))
}

fn internal_error(e: anyhow::Error) -> ApiError {
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::InternalError,
        &e.to_string(),
    )
}

/// Shared by both expansion entry points: identical failures map to
/// identical caller-visible codes.
fn expand_error(err: ExpandError) -> ApiError {
    match err {
        ExpandError::InstancetypeNotFound(_) | ExpandError::PreferenceNotFound(_) => {
            error(StatusCode::NOT_FOUND, ErrorKind::NotFound, &err.to_string())
        }
        ExpandError::Conflict(ref conflicts) => {
            let paths = conflicts.iter().map(|path| path.to_string()).collect();
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    kind: ErrorKind::Conflict,
                    error: err.to_string(),
                    conflicts: Some(paths),
                }),
            )
        }
        ExpandError::Internal(_) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InternalError,
            &err.to_string(),
        ),
    }
}

/// A submitted entity may leave its namespace empty; a non-empty one must
/// match the request namespace.
fn bind_namespace(metadata: &mut Metadata, namespace: &str) -> Result<(), ApiError> {
    if !metadata.namespace.is_empty() && metadata.namespace != namespace {
        return Err(error(
            StatusCode::BAD_REQUEST,
            ErrorKind::ValidationError,
            &format!("VM namespace must be empty or {}", namespace),
        ));
    }
    metadata.namespace = namespace.to_string();
    Ok(())
}

fn require_name(metadata: &Metadata) -> Result<(), ApiError> {
    if metadata.name.is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            ErrorKind::ValidationError,
            "metadata.name must not be empty",
        ));
    }
    Ok(())
}

// --- Spec expansion entry points ---

/// Fetch-by-reference entry point: the stored entity is expanded and the
/// result returned; the store itself is never written.
pub async fn expand_virtual_machine<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<VirtualMachine>, ApiError> {
    let vm = match store.get_virtual_machine(&namespace, &name).await {
        Ok(Some(vm)) => vm,
        Ok(None) => {
            return Err(error(
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound,
                &format!("virtualmachine \"{}\" not found", name),
            ))
        }
        Err(e) => return Err(internal_error(e)),
    };

    log::debug!("expanding virtualmachine {}/{}", namespace, name);
    let resolver = StoreResolver::new(store.as_ref());
    Expander::expand(&resolver, &vm)
        .await
        .map(Json)
        .map_err(expand_error)
}

/// Submit-by-value entry point. The body is decoded in two steps so an
/// undecodable payload and a decodable non-VirtualMachine payload stay
/// distinguishable; namespace validation happens before any resolver call.
pub async fn expand_virtual_machine_spec<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
    body: String,
) -> Result<Json<VirtualMachine>, ApiError> {
    if namespace.is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            ErrorKind::ValidationError,
            "the request namespace must not be empty",
        ));
    }

    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            return Err(error(
                StatusCode::BAD_REQUEST,
                ErrorKind::MalformedInput,
                &format!("cannot decode request body: {}", e),
            ))
        }
    };
    let mut vm: VirtualMachine = match serde_json::from_value(value) {
        Ok(vm) => vm,
        Err(_) => {
            return Err(error(
                StatusCode::BAD_REQUEST,
                ErrorKind::WrongType,
                "object is not a valid VirtualMachine",
            ))
        }
    };

    bind_namespace(&mut vm.metadata, &namespace)?;

    let resolver = StoreResolver::new(store.as_ref());
    Expander::expand(&resolver, &vm)
        .await
        .map(Json)
        .map_err(expand_error)
}

// --- Virtual machines ---

pub async fn list_virtual_machines<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<VirtualMachine>>, ApiError> {
    match store.list_virtual_machines(&namespace).await {
        Ok(items) => Ok(Json(ListResponse {
            total: items.len(),
            items,
        })),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn create_virtual_machine<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
    Json(mut vm): Json<VirtualMachine>,
) -> Result<(StatusCode, Json<VirtualMachine>), ApiError> {
    require_name(&vm.metadata)?;
    bind_namespace(&mut vm.metadata, &namespace)?;
    match store.upsert_virtual_machine(vm).await {
        Ok(stored) => Ok((StatusCode::CREATED, Json(stored))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_virtual_machine<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<VirtualMachine>, ApiError> {
    match store.get_virtual_machine(&namespace, &name).await {
        Ok(Some(vm)) => Ok(Json(vm)),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("virtualmachine \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_virtual_machine<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    match store.delete_virtual_machine(&namespace, &name).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("virtualmachine \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

// --- Instancetypes ---

pub async fn list_instancetypes<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<InstancetypeTemplate>>, ApiError> {
    match store.list_instancetypes(&namespace).await {
        Ok(items) => Ok(Json(ListResponse {
            total: items.len(),
            items,
        })),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn create_instancetype<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
    Json(mut template): Json<InstancetypeTemplate>,
) -> Result<(StatusCode, Json<InstancetypeTemplate>), ApiError> {
    require_name(&template.metadata)?;
    bind_namespace(&mut template.metadata, &namespace)?;
    match store.upsert_instancetype(template).await {
        Ok(stored) => Ok((StatusCode::CREATED, Json(stored))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_instancetype<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<InstancetypeTemplate>, ApiError> {
    match store.get_instancetype(&namespace, &name).await {
        Ok(Some(template)) => Ok(Json(template)),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("instancetype \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_instancetype<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    match store.delete_instancetype(&namespace, &name).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("instancetype \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

// --- Preferences ---

pub async fn list_preferences<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
) -> Result<Json<ListResponse<PreferenceTemplate>>, ApiError> {
    match store.list_preferences(&namespace).await {
        Ok(items) => Ok(Json(ListResponse {
            total: items.len(),
            items,
        })),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn create_preference<S: Store>(
    Path(namespace): Path<String>,
    State(store): State<AppState<S>>,
    Json(mut template): Json<PreferenceTemplate>,
) -> Result<(StatusCode, Json<PreferenceTemplate>), ApiError> {
    require_name(&template.metadata)?;
    bind_namespace(&mut template.metadata, &namespace)?;
    match store.upsert_preference(template).await {
        Ok(stored) => Ok((StatusCode::CREATED, Json(stored))),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_preference<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<Json<PreferenceTemplate>, ApiError> {
    match store.get_preference(&namespace, &name).await {
        Ok(Some(template)) => Ok(Json(template)),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("preference \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn delete_preference<S: Store>(
    Path((namespace, name)): Path<(String, String)>,
    State(store): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    match store.delete_preference(&namespace, &name).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            &format!("preference \"{}\" not found", name),
        )),
        Err(e) => Err(internal_error(e)),
    }
}
