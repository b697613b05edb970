use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use foodgram_rs::{
    config::StorageBackend,
    create_router,
    handlers::{with_server_layers, AdminState, ApiState},
    init_observability,
    observability::{BusinessTracingMiddleware, DatabaseTracingMiddleware, Metrics},
    repositories::{Repositories, TableManager},
    services::CatalogService,
    shutdown_observability, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment()?;
    println!("Configuration loaded successfully");

    init_observability(&config.observability)?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "Storage backend: {:?}, region: {}",
        config.database.storage_backend, config.database.region
    );
    if config.database.storage_backend == StorageBackend::Dynamodb {
        for (aggregate, table) in config.database.table_names() {
            info!("{} table: {}", aggregate, table);
        }
    }

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let (repositories, dynamodb_client) = Repositories::from_config(&config.database).await;
    let table_manager = dynamodb_client.map(|client| Arc::new(TableManager::new(client)));
    info!("Repositories initialized successfully");

    let api_state = ApiState::new(
        &repositories,
        &config.api,
        BusinessTracingMiddleware::new(metrics.clone()),
    );
    let admin_state = AdminState {
        catalog_service: Arc::new(CatalogService::new(
            repositories.tags.clone(),
            repositories.ingredients.clone(),
        )),
        table_manager,
        database: config.database.clone(),
        database_tracing: DatabaseTracingMiddleware::new(metrics.clone()),
    };
    info!("Services initialized successfully");

    let app = with_server_layers(
        create_router(metrics, api_state, admin_state),
        &config.server,
    );

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", err);
        }
        info!("Shutdown signal received");
        shutdown_observability().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
