pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    Defaulter, ExpandError, Expander, InstancetypeOverlay, PreferenceOverlay, StoreResolver,
    TemplateResolver, WorkingSpec,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, Store};

/// Serve the API on an already bound listener. The binary binds the
/// configured address; integration tests bind an ephemeral port first.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    store: std::sync::Arc<store::MemoryStore>,
) -> anyhow::Result<()> {
    let app = api::routes::create_router().with_state(store);
    axum::serve(listener, app).await?;
    Ok(())
}
