use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use super::{rendering, require_user, unique_ids};
use crate::models::{
    Recipe, RelationKind, ServiceResult, ShoppingList, ShoppingListDocument, ShoppingListFormat,
};
use crate::repositories::{
    IngredientRepository, RecipeRepository, RelationRepository, UserRepository,
};

/// Builds the aggregated shopping list for a user's cart
pub struct ShoppingListService {
    recipe_repository: Arc<dyn RecipeRepository>,
    ingredient_repository: Arc<dyn IngredientRepository>,
    relation_repository: Arc<dyn RelationRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl ShoppingListService {
    pub fn new(
        recipe_repository: Arc<dyn RecipeRepository>,
        ingredient_repository: Arc<dyn IngredientRepository>,
        relation_repository: Arc<dyn RelationRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            recipe_repository,
            ingredient_repository,
            relation_repository,
            user_repository,
        }
    }

    /// Cart recipes in the order they were added
    async fn cart_recipes(&self, user_id: &str) -> ServiceResult<Vec<Recipe>> {
        let cart_ids: Vec<String> = self
            .relation_repository
            .list_for_user(user_id, RelationKind::ShoppingCart)
            .await?
            .into_iter()
            .map(|relation| relation.target_id)
            .collect();

        let mut by_id: HashMap<String, Recipe> = self
            .recipe_repository
            .find_by_ids(&cart_ids)
            .await?
            .into_iter()
            .map(|recipe| (recipe.id.clone(), recipe))
            .collect();

        // Entries whose recipe is gone are skipped
        Ok(cart_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    /// Sum ingredient amounts over every recipe in the user's cart
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn build(&self, user_id: &str) -> ServiceResult<ShoppingList> {
        crate::info_with_trace!("Building shopping list");

        require_user(self.user_repository.as_ref(), user_id).await?;

        let recipes = self.cart_recipes(user_id).await?;
        let ingredient_ids = unique_ids(
            recipes
                .iter()
                .flat_map(|recipe| recipe.ingredients.iter())
                .map(|line| &line.ingredient_id),
        );
        let catalog = self
            .ingredient_repository
            .find_by_ids(&ingredient_ids)
            .await?;

        let list = ShoppingList::from_recipes(&recipes, &catalog);

        crate::info_with_trace!(
            "Shopping list has {} items from {} recipes",
            list.items.len(),
            recipes.len()
        );
        Ok(list)
    }

    /// Build and render the shopping list
    #[instrument(skip(self), fields(user_id = %user_id, format = %format))]
    pub async fn download(
        &self,
        user_id: &str,
        format: ShoppingListFormat,
    ) -> ServiceResult<ShoppingListDocument> {
        let list = self.build(user_id).await?;
        Ok(rendering::render(&list, format))
    }
}
