use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use vmplane::api::routes::create_router;
use vmplane::config::AppConfig;
use vmplane::seed;
use vmplane::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new().filter_level(LevelFilter::Info).init();

    println!("vmplane: virtual machine control plane");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = Arc::new(MemoryStore::new());

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        seed::load_seed_data(&*store).await?;
    }

    let app = create_router().with_state(store);
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("vmplane server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
