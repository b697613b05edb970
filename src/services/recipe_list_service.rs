use std::sync::Arc;
use tracing::instrument;

use super::require_user;
use crate::models::{
    RecipePreview, Relation, RelationKind, RepositoryError, ServiceError, ServiceResult,
};
use crate::repositories::{RecipeRepository, RelationRepository, UserRepository};

/// Favorites and shopping cart membership
pub struct RecipeListService {
    recipe_repository: Arc<dyn RecipeRepository>,
    relation_repository: Arc<dyn RelationRepository>,
    user_repository: Arc<dyn UserRepository>,
    media_base_url: String,
}

fn ensure_recipe_list(kind: RelationKind) -> ServiceResult<()> {
    if !RelationKind::RECIPE_LISTS.contains(&kind) {
        return Err(ServiceError::ValidationError {
            message: format!("{} is not a recipe list", kind),
        });
    }
    Ok(())
}

impl RecipeListService {
    pub fn new(
        recipe_repository: Arc<dyn RecipeRepository>,
        relation_repository: Arc<dyn RelationRepository>,
        user_repository: Arc<dyn UserRepository>,
        media_base_url: String,
    ) -> Self {
        Self {
            recipe_repository,
            relation_repository,
            user_repository,
            media_base_url,
        }
    }

    /// Put a recipe on one of the user's lists. The storage layer's conditional
    /// insert decides whether the pair already exists.
    #[instrument(skip(self), fields(user_id = %user_id, recipe_id = %recipe_id, list = %kind))]
    pub async fn add(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: RelationKind,
    ) -> ServiceResult<RecipePreview> {
        crate::info_with_trace!("Adding recipe to list");

        ensure_recipe_list(kind)?;
        require_user(self.user_repository.as_ref(), user_id).await?;

        let recipe = self
            .recipe_repository
            .find_by_id(recipe_id)
            .await?
            .ok_or_else(|| ServiceError::RecipeNotFound {
                id: recipe_id.to_string(),
            })?;

        self.relation_repository
            .insert(Relation::new(
                user_id.to_string(),
                kind,
                recipe_id.to_string(),
            ))
            .await
            .map_err(|err| match err {
                RepositoryError::AlreadyExists => ServiceError::RelationAlreadyExists {
                    kind,
                    target_id: recipe_id.to_string(),
                },
                other => other.into(),
            })?;

        crate::info_with_trace!("Recipe added to {}", kind);
        Ok(recipe.to_preview(&self.media_base_url))
    }

    /// Take a recipe off one of the user's lists
    #[instrument(skip(self), fields(user_id = %user_id, recipe_id = %recipe_id, list = %kind))]
    pub async fn remove(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: RelationKind,
    ) -> ServiceResult<()> {
        crate::info_with_trace!("Removing recipe from list");

        ensure_recipe_list(kind)?;
        require_user(self.user_repository.as_ref(), user_id).await?;

        if self
            .recipe_repository
            .find_by_id(recipe_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::RecipeNotFound {
                id: recipe_id.to_string(),
            });
        }

        self.relation_repository
            .remove(user_id, kind, recipe_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => ServiceError::RelationNotFound {
                    kind,
                    target_id: recipe_id.to_string(),
                },
                other => other.into(),
            })?;

        crate::info_with_trace!("Recipe removed from {}", kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateRecipeRequest, CreateUserRequest, IngredientAmountInput, Recipe, User};
    use crate::repositories::{
        InMemoryRecipeRepository, InMemoryRelationRepository, InMemoryUserRepository,
    };
    use crate::services::mocks::{MockRecipeRepo, MockRelationRepo, MockUserRepo};

    fn test_recipe() -> Recipe {
        Recipe::new(
            "author".to_string(),
            CreateRecipeRequest {
                ingredients: vec![IngredientAmountInput {
                    id: "salt".to_string(),
                    amount: 5,
                }],
                tags: vec!["dinner".to_string()],
                image: "recipes/images/soup.png".to_string(),
                name: "Soup".to_string(),
                text: "Simmer".to_string(),
                cooking_time: 40,
            },
        )
    }

    fn test_user() -> User {
        User::new(CreateUserRequest {
            email: "reader@example.com".to_string(),
            username: "reader".to_string(),
            first_name: "Read".to_string(),
            last_name: "Er".to_string(),
        })
    }

    async fn service_with_recipe() -> (RecipeListService, Recipe, User) {
        let recipes = Arc::new(InMemoryRecipeRepository::default());
        let users = Arc::new(InMemoryUserRepository::default());
        let recipe = recipes.create(test_recipe()).await.unwrap();
        let user = users.create(test_user()).await.unwrap();

        let service = RecipeListService::new(
            recipes,
            Arc::new(InMemoryRelationRepository::default()),
            users,
            "http://media.test".to_string(),
        );
        (service, recipe, user)
    }

    #[tokio::test]
    async fn test_add_returns_preview() {
        let (service, recipe, user) = service_with_recipe().await;

        let preview = service
            .add(&user.id, &recipe.id, RelationKind::Favorite)
            .await
            .unwrap();

        assert_eq!(preview.id, recipe.id);
        assert_eq!(preview.name, "Soup");
        assert_eq!(preview.cooking_time, 40);
        assert_eq!(preview.image, "http://media.test/recipes/images/soup.png");
    }

    #[tokio::test]
    async fn test_add_twice_and_remove_twice() {
        let (service, recipe, user) = service_with_recipe().await;

        for kind in RelationKind::RECIPE_LISTS {
            service.add(&user.id, &recipe.id, kind).await.unwrap();
            assert!(matches!(
                service.add(&user.id, &recipe.id, kind).await,
                Err(ServiceError::RelationAlreadyExists { .. })
            ));

            service.remove(&user.id, &recipe.id, kind).await.unwrap();
            assert!(matches!(
                service.remove(&user.id, &recipe.id, kind).await,
                Err(ServiceError::RelationNotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_lists_are_independent() {
        let (service, recipe, user) = service_with_recipe().await;

        service
            .add(&user.id, &recipe.id, RelationKind::Favorite)
            .await
            .unwrap();

        assert!(matches!(
            service
                .remove(&user.id, &recipe.id, RelationKind::ShoppingCart)
                .await,
            Err(ServiceError::RelationNotFound {
                kind: RelationKind::ShoppingCart,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_recipe() {
        let (service, _, user) = service_with_recipe().await;

        assert!(matches!(
            service.add(&user.id, "missing", RelationKind::Favorite).await,
            Err(ServiceError::RecipeNotFound { .. })
        ));
        assert!(matches!(
            service
                .remove(&user.id, "missing", RelationKind::ShoppingCart)
                .await,
            Err(ServiceError::RecipeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_follow_is_not_a_recipe_list() {
        let service = RecipeListService::new(
            Arc::new(MockRecipeRepo::new()),
            Arc::new(MockRelationRepo::new()),
            Arc::new(MockUserRepo::new()),
            "http://media.test".to_string(),
        );

        assert!(matches!(
            service.add("u1", "r1", RelationKind::Follow).await,
            Err(ServiceError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let recipe = test_recipe();
        let recipe_id = recipe.id.clone();
        let user = test_user();

        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(recipe.clone())));

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let mut relations = MockRelationRepo::new();
        relations
            .expect_insert()
            .times(1)
            .returning(|_| Err(RepositoryError::RateLimitExceeded));

        let service = RecipeListService::new(
            Arc::new(recipes),
            Arc::new(relations),
            Arc::new(users),
            "http://media.test".to_string(),
        );

        let result = service
            .add("reader", &recipe_id, RelationKind::ShoppingCart)
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Repository {
                source: RepositoryError::RateLimitExceeded
            })
        ));
    }
}
