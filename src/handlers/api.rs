use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::ApiConfig;
use crate::models::{
    validate_user_id, CreateRecipeRequest, CreateUserRequest, Ingredient, IngredientSearchQuery,
    Page, PageParams, RecipeFilters, RecipePreview, RecipeResponse, RelationKind,
    RepositoryError, ServiceError, ShoppingListFormat, SubscriptionResponse, Tag,
    UpdateRecipeRequest, UserResponse,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::Repositories;
use crate::services::{
    CatalogService, RecipeListService, RecipeService, ShoppingListService, SubscriptionService,
    UserService,
};

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<Value>);

/// Shared application state containing all services
#[derive(Clone)]
pub struct ApiState {
    pub recipe_service: Arc<RecipeService>,
    pub recipe_list_service: Arc<RecipeListService>,
    pub shopping_list_service: Arc<ShoppingListService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub business_tracing: BusinessTracingMiddleware,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl ApiState {
    pub fn new(
        repositories: &Repositories,
        api: &ApiConfig,
        business_tracing: BusinessTracingMiddleware,
    ) -> Self {
        let media_base_url = api.media_base_url.clone();
        Self {
            recipe_service: Arc::new(RecipeService::new(
                repositories.recipes.clone(),
                repositories.ingredients.clone(),
                repositories.tags.clone(),
                repositories.users.clone(),
                repositories.relations.clone(),
                media_base_url.clone(),
            )),
            recipe_list_service: Arc::new(RecipeListService::new(
                repositories.recipes.clone(),
                repositories.relations.clone(),
                repositories.users.clone(),
                media_base_url.clone(),
            )),
            shopping_list_service: Arc::new(ShoppingListService::new(
                repositories.recipes.clone(),
                repositories.ingredients.clone(),
                repositories.relations.clone(),
                repositories.users.clone(),
            )),
            subscription_service: Arc::new(SubscriptionService::new(
                repositories.users.clone(),
                repositories.recipes.clone(),
                repositories.relations.clone(),
                media_base_url,
            )),
            user_service: Arc::new(UserService::new(
                repositories.users.clone(),
                repositories.relations.clone(),
            )),
            catalog_service: Arc::new(CatalogService::new(
                repositories.tags.clone(),
                repositories.ingredients.clone(),
            )),
            business_tracing,
            default_page_size: api.default_page_size,
            max_page_size: api.max_page_size,
        }
    }

    fn resolve_page(&self, params: PageParams) -> (usize, usize) {
        params.resolve(self.default_page_size, self.max_page_size)
    }
}

/// Query parameters for the subscription endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub recipes_limit: Option<usize>,
}

/// Query parameters for the shopping list download
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

/// Caller id from the identity header, if any. A present but malformed id is
/// rejected rather than treated as anonymous.
pub fn caller_id(headers: &HeaderMap) -> Result<Option<String>, ServiceError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let user_id = value
        .to_str()
        .map_err(|_| ServiceError::Unauthenticated)?
        .trim();
    validate_user_id(user_id).map_err(|_| ServiceError::Unauthenticated)?;
    Ok(Some(user_id.to_string()))
}

fn required_caller(headers: &HeaderMap) -> Result<String, ApiError> {
    caller_id(headers)
        .and_then(|caller| caller.ok_or(ServiceError::Unauthenticated))
        .map_err(service_error_to_response)
}

fn optional_caller(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    caller_id(headers).map_err(service_error_to_response)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        crate::warn_with_trace!("Rejected request body: {}", rejection.body_text());
        (
            rejection.status(),
            Json(json!({
                "error": rejection.body_text(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
    })
}

fn invalid_query(message: String) -> ApiError {
    crate::warn_with_trace!("Invalid query parameters: {}", message);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Invalid query parameters",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

fn service_failure(operation: &str, err: ServiceError) -> ApiError {
    match &err {
        ServiceError::Repository { .. } | ServiceError::Rendering { .. } => {
            crate::error_with_trace!("Failed to {}: {}", operation, err)
        }
        _ => crate::warn_with_trace!("Failed to {}: {}", operation, err),
    }
    service_error_to_response(err)
}

// =============================================================================
// CATALOG ENDPOINTS
// =============================================================================

#[instrument(name = "list_tags", skip(state))]
pub async fn list_tags(State(state): State<ApiState>) -> Result<Json<Vec<Tag>>, ApiError> {
    state
        .catalog_service
        .list_tags()
        .await
        .map(Json)
        .map_err(|err| service_failure("list tags", err))
}

#[instrument(name = "get_tag", skip(state), fields(tag_id = %tag_id))]
pub async fn get_tag(
    State(state): State<ApiState>,
    Path(tag_id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    state
        .catalog_service
        .get_tag(&tag_id)
        .await
        .map(Json)
        .map_err(|err| service_failure("get tag", err))
}

#[instrument(name = "list_ingredients", skip(state), fields(name = query.name.as_deref()))]
pub async fn list_ingredients(
    State(state): State<ApiState>,
    Query(query): Query<IngredientSearchQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    state
        .catalog_service
        .list_ingredients(query.name.as_deref())
        .await
        .map(Json)
        .map_err(|err| service_failure("list ingredients", err))
}

#[instrument(name = "get_ingredient", skip(state), fields(ingredient_id = %ingredient_id))]
pub async fn get_ingredient(
    State(state): State<ApiState>,
    Path(ingredient_id): Path<String>,
) -> Result<Json<Ingredient>, ApiError> {
    state
        .catalog_service
        .get_ingredient(&ingredient_id)
        .await
        .map(Json)
        .map_err(|err| service_failure("get ingredient", err))
}

// =============================================================================
// RECIPE ENDPOINTS
// =============================================================================

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(format!("Invalid {}: {}", key, other)),
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {}: {}", key, value))
}

/// Recipe list query. `tags` may repeat; unknown keys are ignored.
fn parse_recipe_query(pairs: &[(String, String)]) -> Result<(RecipeFilters, PageParams), String> {
    let mut filters = RecipeFilters::default();
    let mut page = PageParams::default();

    for (key, value) in pairs {
        match key.as_str() {
            "tags" => filters.tags.push(value.trim().to_string()),
            "author" => filters.author_id = Some(value.trim().to_string()),
            "is_favorited" => filters.is_favorited = parse_flag(key, value)?,
            "is_in_shopping_cart" => filters.is_in_shopping_cart = parse_flag(key, value)?,
            "page" => page.page = Some(parse_number(key, value)?),
            "limit" => page.limit = Some(parse_number(key, value)?),
            _ => {}
        }
    }

    Ok((filters, page))
}

/// List recipes with tag, author and per-viewer filters
#[instrument(name = "list_recipes", skip(state, headers, query))]
pub async fn list_recipes(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeResponse>>, ApiError> {
    let viewer = optional_caller(&headers)?;
    let (filters, page_params) = parse_recipe_query(&query).map_err(invalid_query)?;
    let (page, limit) = state.resolve_page(page_params);

    info!("Listing recipes, page {} limit {}", page, limit);

    state
        .business_tracing
        .trace_recipe_operation(
            "list",
            state
                .recipe_service
                .list(filters, page, limit, viewer.as_deref()),
        )
        .await
        .map(Json)
        .map_err(|err| service_failure("list recipes", err))
}

#[instrument(name = "get_recipe", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn get_recipe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let viewer = optional_caller(&headers)?;

    state
        .business_tracing
        .trace_recipe_operation(
            "get",
            state.recipe_service.get(&recipe_id, viewer.as_deref()),
        )
        .await
        .map(Json)
        .map_err(|err| service_failure("get recipe", err))
}

#[instrument(name = "create_recipe", skip(state, headers, payload))]
pub async fn create_recipe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let user_id = required_caller(&headers)?;
    let request = json_body(payload)?;

    crate::info_with_trace!("Creating recipe '{}' for user {}", request.name, user_id);

    let recipe = state
        .business_tracing
        .trace_recipe_operation("create", state.recipe_service.create(&user_id, request))
        .await
        .map_err(|err| service_failure("create recipe", err))?;

    crate::info_with_trace!("Successfully created recipe with ID: {}", recipe.id);
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(name = "update_recipe", skip(state, headers, payload), fields(recipe_id = %recipe_id))]
pub async fn update_recipe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
    payload: Result<Json<UpdateRecipeRequest>, JsonRejection>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let user_id = required_caller(&headers)?;
    let request = json_body(payload)?;

    state
        .business_tracing
        .trace_recipe_operation(
            "update",
            state.recipe_service.update(&user_id, &recipe_id, request),
        )
        .await
        .map(Json)
        .map_err(|err| service_failure("update recipe", err))
}

#[instrument(name = "delete_recipe", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn delete_recipe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = required_caller(&headers)?;

    state
        .business_tracing
        .trace_recipe_operation("delete", state.recipe_service.delete(&user_id, &recipe_id))
        .await
        .map_err(|err| service_failure("delete recipe", err))?;

    crate::info_with_trace!("Successfully deleted recipe {}", recipe_id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// FAVORITE AND SHOPPING CART ENDPOINTS
// =============================================================================

async fn add_to_list(
    state: &ApiState,
    headers: &HeaderMap,
    recipe_id: &str,
    kind: RelationKind,
) -> Result<(StatusCode, Json<RecipePreview>), ApiError> {
    let user_id = required_caller(headers)?;

    let preview = state
        .business_tracing
        .trace_recipe_list_operation(
            kind,
            "add",
            state.recipe_list_service.add(&user_id, recipe_id, kind),
        )
        .await
        .map_err(|err| service_failure("add recipe to list", err))?;

    Ok((StatusCode::CREATED, Json(preview)))
}

async fn remove_from_list(
    state: &ApiState,
    headers: &HeaderMap,
    recipe_id: &str,
    kind: RelationKind,
) -> Result<StatusCode, ApiError> {
    let user_id = required_caller(headers)?;

    state
        .business_tracing
        .trace_recipe_list_operation(
            kind,
            "remove",
            state.recipe_list_service.remove(&user_id, recipe_id, kind),
        )
        .await
        .map_err(|err| service_failure("remove recipe from list", err))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "add_favorite", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn add_favorite(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<(StatusCode, Json<RecipePreview>), ApiError> {
    add_to_list(&state, &headers, &recipe_id, RelationKind::Favorite).await
}

#[instrument(name = "remove_favorite", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn remove_favorite(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, &headers, &recipe_id, RelationKind::Favorite).await
}

#[instrument(name = "add_to_shopping_cart", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn add_to_shopping_cart(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<(StatusCode, Json<RecipePreview>), ApiError> {
    add_to_list(&state, &headers, &recipe_id, RelationKind::ShoppingCart).await
}

#[instrument(name = "remove_from_shopping_cart", skip(state, headers), fields(recipe_id = %recipe_id))]
pub async fn remove_from_shopping_cart(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(recipe_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, &headers, &recipe_id, RelationKind::ShoppingCart).await
}

/// Aggregated shopping list as a file attachment
#[instrument(name = "download_shopping_cart", skip(state, headers))]
pub async fn download_shopping_cart(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let user_id = required_caller(&headers)?;
    let format = match query.format.as_deref() {
        Some(format) => format.parse::<ShoppingListFormat>().map_err(invalid_query)?,
        None => ShoppingListFormat::default(),
    };

    let document = state
        .business_tracing
        .trace_shopping_list_download(
            format,
            state.shopping_list_service.download(&user_id, format),
        )
        .await
        .map_err(|err| service_failure("download shopping list", err))?;

    crate::info_with_trace!(
        "Serving {} shopping list of {} bytes",
        format,
        document.body.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        document.body,
    )
        .into_response())
}

// =============================================================================
// USER ENDPOINTS
// =============================================================================

#[instrument(name = "list_users", skip(state, headers))]
pub async fn list_users(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let viewer = optional_caller(&headers)?;
    let (page, limit) = state.resolve_page(params);

    state
        .user_service
        .list(page, limit, viewer.as_deref())
        .await
        .map(Json)
        .map_err(|err| service_failure("list users", err))
}

#[instrument(name = "create_user", skip(state, payload))]
pub async fn create_user(
    State(state): State<ApiState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let request = json_body(payload)?;

    let user = state
        .user_service
        .create(request)
        .await
        .map_err(|err| service_failure("create user", err))?;

    crate::info_with_trace!("Successfully created user with ID: {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(name = "get_me", skip(state, headers))]
pub async fn get_me(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = required_caller(&headers)?;

    state
        .user_service
        .me(&user_id)
        .await
        .map(Json)
        .map_err(|err| service_failure("get current user", err))
}

#[instrument(name = "get_user", skip(state, headers), fields(user_id = %user_id))]
pub async fn get_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let viewer = optional_caller(&headers)?;

    state
        .user_service
        .get(&user_id, viewer.as_deref())
        .await
        .map(Json)
        .map_err(|err| service_failure("get user", err))
}

#[instrument(name = "subscribe", skip(state, headers, query), fields(target_id = %target_id))]
pub async fn subscribe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(target_id): Path<String>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    let user_id = required_caller(&headers)?;

    let subscription = state
        .business_tracing
        .trace_subscription_operation(
            "follow",
            state
                .subscription_service
                .follow(&user_id, &target_id, query.recipes_limit),
        )
        .await
        .map_err(|err| service_failure("subscribe", err))?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

#[instrument(name = "unsubscribe", skip(state, headers), fields(target_id = %target_id))]
pub async fn unsubscribe(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(target_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = required_caller(&headers)?;

    state
        .business_tracing
        .trace_subscription_operation(
            "unfollow",
            state.subscription_service.unfollow(&user_id, &target_id),
        )
        .await
        .map_err(|err| service_failure("unsubscribe", err))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "list_subscriptions", skip(state, headers, query))]
pub async fn list_subscriptions(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionResponse>>, ApiError> {
    let user_id = required_caller(&headers)?;
    let (page, limit) = state.resolve_page(PageParams {
        page: query.page,
        limit: query.limit,
    });

    state
        .business_tracing
        .trace_subscription_operation(
            "list",
            state.subscription_service.list_subscriptions(
                &user_id,
                page,
                limit,
                query.recipes_limit,
            ),
        )
        .await
        .map(Json)
        .map_err(|err| service_failure("list subscriptions", err))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Convert ServiceError to HTTP response
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let (status, message) = match err {
        ServiceError::RecipeNotFound { .. }
        | ServiceError::UserNotFound { .. }
        | ServiceError::TagNotFound { .. }
        | ServiceError::IngredientNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::RelationNotFound { .. }
        | ServiceError::RelationAlreadyExists { .. }
        | ServiceError::AlreadyExists { .. }
        | ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        ServiceError::Unauthenticated => (StatusCode::UNAUTHORIZED, err.to_string()),
        ServiceError::Repository { source } => match source {
            RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            RepositoryError::ConnectionFailed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Database connection failed".to_string(),
            ),
            RepositoryError::Timeout => {
                (StatusCode::REQUEST_TIMEOUT, "Request timeout".to_string())
            }
            RepositoryError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        },
        ServiceError::Rendering { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render document".to_string(),
        ),
    };

    (
        status,
        Json(json!({
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
