use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::api::{service_error_to_response, ApiError};
use crate::config::DatabaseConfig;
use crate::models::{
    CreateTagRequest, ImportIngredientsRequest, ImportSummary, ServiceError, Tag,
};
use crate::observability::DatabaseTracingMiddleware;
use crate::repositories::TableManager;
use crate::services::CatalogService;

/// Admin state containing services
#[derive(Clone)]
pub struct AdminState {
    pub catalog_service: Arc<CatalogService>,
    /// Present only for the DynamoDB backend
    pub table_manager: Option<Arc<TableManager>>,
    pub database: DatabaseConfig,
    pub database_tracing: DatabaseTracingMiddleware,
}

/// Response for table setup operations
#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

/// Response for ingredient imports
#[derive(Debug, Serialize)]
pub struct ImportIngredientsResponse {
    pub message: String,
    pub created: usize,
    pub existing: usize,
    pub timestamp: String,
}

impl From<ImportSummary> for ImportIngredientsResponse {
    fn from(summary: ImportSummary) -> Self {
        Self {
            message: format!(
                "Imported {} new ingredients, {} already present",
                summary.created, summary.existing
            ),
            created: summary.created,
            existing: summary.existing,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn admin_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("Rejected admin request body: {}", rejection.body_text());
        (
            rejection.status(),
            Json(json!({
                "error": rejection.body_text(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
    })
}

// =============================================================================
// DATABASE SETUP
// =============================================================================

/// Set up the required DynamoDB tables
#[instrument(name = "setup_tables", skip(state), fields(
    recipes_table = %state.database.recipes_table_name,
    relations_table = %state.database.relations_table_name,
))]
pub async fn setup_tables(
    State(state): State<AdminState>,
) -> Result<Json<SetupTablesResponse>, ApiError> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let Some(table_manager) = state.table_manager.as_ref() else {
        warn!("Table setup requested on a backend without tables");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Table setup is only available for the dynamodb storage backend",
                "timestamp": timestamp,
            })),
        ));
    };

    info!("Setting up DynamoDB tables");

    match state
        .database_tracing
        .trace_operation(
            "create_tables",
            "all",
            table_manager.create_all_tables(&state.database),
        )
        .await
    {
        Ok(tables_created) => {
            info!("Successfully created tables: {:?}", tables_created);

            Ok(Json(SetupTablesResponse {
                message: format!("Successfully created {} tables", tables_created.len()),
                tables_created,
                timestamp,
            }))
        }
        Err(err) => {
            error!("Failed to create tables: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to create tables",
                    "message": err.to_string(),
                    "timestamp": timestamp,
                })),
            ))
        }
    }
}

// =============================================================================
// CATALOG MANAGEMENT
// =============================================================================

#[instrument(name = "admin_create_tag", skip(state, payload))]
pub async fn create_tag(
    State(state): State<AdminState>,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let request = admin_body(payload)?;

    info!("Creating tag: {}", request.slug);

    match state.catalog_service.create_tag(request).await {
        Ok(tag) => {
            info!("Successfully created tag with ID: {}", tag.id);
            Ok((StatusCode::CREATED, Json(tag)))
        }
        Err(err) => {
            warn!("Failed to create tag: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

/// Bulk get-or-create of ingredients
#[instrument(name = "admin_import_ingredients", skip(state, payload))]
pub async fn import_ingredients(
    State(state): State<AdminState>,
    payload: Result<Json<ImportIngredientsRequest>, JsonRejection>,
) -> Result<Json<ImportIngredientsResponse>, ApiError> {
    let request = admin_body(payload)?;

    if request.ingredients.is_empty() {
        return Err(service_error_to_response(ServiceError::ValidationError {
            message: "No ingredients to import".to_string(),
        }));
    }

    info!("Importing {} ingredients", request.ingredients.len());

    let table = state.database.ingredients_table_name.clone();
    match state
        .database_tracing
        .trace_operation(
            "import_ingredients",
            &table,
            state.catalog_service.import_ingredients(request.ingredients),
        )
        .await
    {
        Ok(summary) => Ok(Json(summary.into())),
        Err(err) => {
            error!("Failed to import ingredients: {}", err);
            Err(service_error_to_response(err))
        }
    }
}
