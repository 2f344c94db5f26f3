//! CRM Service - multi-tenant CRM HTTP API.
//!
//! This is the main entry point for the CRM service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_service::tenancy::bootstrap_super_admin;
use crm_service::{create_router, AppState, ServiceConfig};
use crm_store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crm=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CRM Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();
    let catalog = config.plan_catalog()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        plan_catalog = config.plan_catalog_path.as_deref().unwrap_or("built-in"),
        lifecycle_interval_seconds = config.lifecycle_interval_seconds,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    if let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) {
        if let Some(admin) = bootstrap_super_admin(store.as_ref(), email, password).await? {
            tracing::info!(
                user_id = %admin.id,
                email = %admin.email,
                "Bootstrap super admin created"
            );
        }
    }

    // Build app state
    let state = AppState::new(store, config.clone(), catalog);

    // Billing lifecycle runs on startup and then periodically
    let lifecycle = Arc::clone(&state.lifecycle)
        .spawn(Duration::from_secs(config.lifecycle_interval_seconds));

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    lifecycle.abort();
    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(crm_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::warn!(
        data_dir = %config.data_dir,
        "Built without rocksdb-backend - using an in-memory store, data will not survive a restart"
    );
    Ok(Arc::new(crm_store::MemoryStore::new()))
}
