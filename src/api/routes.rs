use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Spec expansion entry points
        .route(
            "/namespaces/:namespace/virtualmachines/:name/expand-spec",
            get(handlers::expand_virtual_machine::<S>),
        )
        .route(
            "/namespaces/:namespace/expand-vm-spec",
            post(handlers::expand_virtual_machine_spec::<S>),
        )
        // Virtual machines
        .route(
            "/namespaces/:namespace/virtualmachines",
            get(handlers::list_virtual_machines::<S>),
        )
        .route(
            "/namespaces/:namespace/virtualmachines",
            post(handlers::create_virtual_machine::<S>),
        )
        .route(
            "/namespaces/:namespace/virtualmachines/:name",
            get(handlers::get_virtual_machine::<S>),
        )
        .route(
            "/namespaces/:namespace/virtualmachines/:name",
            delete(handlers::delete_virtual_machine::<S>),
        )
        // Instancetypes
        .route(
            "/namespaces/:namespace/instancetypes",
            get(handlers::list_instancetypes::<S>),
        )
        .route(
            "/namespaces/:namespace/instancetypes",
            post(handlers::create_instancetype::<S>),
        )
        .route(
            "/namespaces/:namespace/instancetypes/:name",
            get(handlers::get_instancetype::<S>),
        )
        .route(
            "/namespaces/:namespace/instancetypes/:name",
            delete(handlers::delete_instancetype::<S>),
        )
        // Preferences
        .route(
            "/namespaces/:namespace/preferences",
            get(handlers::list_preferences::<S>),
        )
        .route(
            "/namespaces/:namespace/preferences",
            post(handlers::create_preference::<S>),
        )
        .route(
            "/namespaces/:namespace/preferences/:name",
            get(handlers::get_preference::<S>),
        )
        .route(
            "/namespaces/:namespace/preferences/:name",
            delete(handlers::delete_preference::<S>),
        )
}
