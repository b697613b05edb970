pub mod admin;
pub mod api;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use admin::*;
pub use api::*;
pub use health::*;
pub use metrics::*;
pub use middleware::*;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::observability::{observability_middleware, Metrics};

/// Build the full application router
pub fn create_router(metrics: Arc<Metrics>, api_state: ApiState, admin_state: AdminState) -> Router {
    let metrics_for_middleware = metrics.clone();

    Router::new()
        // Health and metrics endpoints (with metrics state)
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        // Catalog
        .route("/api/tags", get(api::list_tags))
        .route("/api/tags/:tag_id", get(api::get_tag))
        .route("/api/ingredients", get(api::list_ingredients))
        .route("/api/ingredients/:ingredient_id", get(api::get_ingredient))
        // Recipes
        .route(
            "/api/recipes",
            get(api::list_recipes).post(api::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(api::download_shopping_cart),
        )
        .route(
            "/api/recipes/:recipe_id",
            get(api::get_recipe)
                .patch(api::update_recipe)
                .delete(api::delete_recipe),
        )
        .route(
            "/api/recipes/:recipe_id/favorite",
            post(api::add_favorite).delete(api::remove_favorite),
        )
        .route(
            "/api/recipes/:recipe_id/shopping_cart",
            post(api::add_to_shopping_cart).delete(api::remove_from_shopping_cart),
        )
        // Users and subscriptions
        .route("/api/users", get(api::list_users).post(api::create_user))
        .route("/api/users/me", get(api::get_me))
        .route("/api/users/subscriptions", get(api::list_subscriptions))
        .route("/api/users/:user_id", get(api::get_user))
        .route(
            "/api/users/:user_id/subscribe",
            post(api::subscribe).delete(api::unsubscribe),
        )
        .with_state(api_state)
        // Admin endpoints (with admin state)
        .route("/api/admin/setup-tables", post(admin::setup_tables))
        .route("/api/admin/tags", post(admin::create_tag))
        .route(
            "/api/admin/ingredients/import",
            post(admin::import_ingredients),
        )
        .with_state(admin_state)
        // Add middleware layers (order matters - outer to inner)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(cors_middleware))
        .layer(axum_middleware::from_fn(request_validation_middleware))
        .layer(axum_middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

/// Wrap the router in HTTP tracing, the body size limit and the request
/// timeout. The timeout sits innermost so it sees the plain axum body.
pub fn with_server_layers(router: Router, server: &ServerConfig) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(server.max_request_size))
            .layer(TimeoutLayer::new(server.request_timeout())),
    )
}
