// Services module - business logic layer

pub mod catalog_service;
pub mod recipe_list_service;
pub mod recipe_service;
pub mod rendering;
pub mod shopping_list_service;
pub mod subscription_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod mocks;

pub use catalog_service::{parse_ingredient_csv, CatalogService};
pub use recipe_list_service::RecipeListService;
pub use recipe_service::RecipeService;
pub use shopping_list_service::ShoppingListService;
pub use subscription_service::SubscriptionService;
pub use user_service::UserService;

use std::collections::HashSet;

use crate::models::{ServiceError, ServiceResult, User};
use crate::repositories::UserRepository;

/// Distinct ids in first-seen order
pub(crate) fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Resolve the caller of an authenticated operation. An id that matches no
/// profile is treated like a missing identity.
pub(crate) async fn require_user(
    users: &dyn UserRepository,
    user_id: &str,
) -> ServiceResult<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or(ServiceError::Unauthenticated)
}
