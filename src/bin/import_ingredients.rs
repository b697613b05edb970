//! Load a `name,measurement_unit` CSV into the ingredient catalog.
//!
//! Usage: `import-ingredients <path.csv>`. Storage settings come from the same
//! `FOODGRAM_*` environment variables as the server.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram_rs::{
    config::StorageBackend, observability::tracing::default_filter_directives,
    repositories::Repositories, services::parse_ingredient_csv, services::CatalogService, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: import-ingredients <path.csv>");
    };

    let config = Config::from_environment().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_filter_directives(
                    &config.observability.service_name,
                    &config.observability.log_level,
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if config.database.storage_backend == StorageBackend::Memory {
        bail!("the memory backend does not persist; set FOODGRAM_STORAGE_BACKEND=dynamodb");
    }

    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let rows = parse_ingredient_csv(&text).with_context(|| format!("invalid CSV in {}", path))?;
    info!("Parsed {} ingredient rows from {}", rows.len(), path);

    let (repositories, _) = Repositories::from_config(&config.database).await;
    let catalog = CatalogService::new(repositories.tags, repositories.ingredients);

    let summary = catalog
        .import_ingredients(rows)
        .await
        .context("ingredient import failed")?;

    println!(
        "Imported ingredients into {}: {} created, {} already present",
        config.database.ingredients_table_name, summary.created, summary.existing
    );
    Ok(())
}
