//! In-process repositories selected with `FOODGRAM_STORAGE_BACKEND=memory`.
//! They honour the same uniqueness and existence rules as the DynamoDB ones.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    IngredientRepository, RecipeRepository, RelationRepository, TagRepository, UserRepository,
};
use crate::models::{
    Ingredient, Recipe, Relation, RelationKind, RepositoryError, RepositoryResult, Tag, User,
};

fn pick<T: Clone>(map: &HashMap<String, T>, ids: &[String]) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| map.get(id).cloned())
        .collect()
}

#[derive(Default)]
pub struct InMemoryRecipeRepository {
    recipes: RwLock<HashMap<String, Recipe>>,
}

#[derive(Default)]
pub struct InMemoryIngredientRepository {
    ingredients: RwLock<HashMap<String, Ingredient>>,
}

#[derive(Default)]
pub struct InMemoryTagRepository {
    tags: RwLock<HashMap<String, Tag>>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

/// Relations keyed by `(user_id, kind, target_id)`, kept in insertion order
#[derive(Default)]
pub struct InMemoryRelationRepository {
    relations: RwLock<IndexMap<(String, RelationKind, String), Relation>>,
}

#[async_trait]
impl RecipeRepository for InMemoryRecipeRepository {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Recipe>> {
        Ok(self.recipes.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Recipe>> {
        Ok(pick(&*self.recipes.read().await, ids))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Recipe>> {
        Ok(self.recipes.read().await.values().cloned().collect())
    }

    async fn find_by_author(&self, author_id: &str) -> RepositoryResult<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> = self
            .recipes
            .read()
            .await
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(recipes)
    }

    async fn count_by_author(&self, author_id: &str) -> RepositoryResult<usize> {
        Ok(self
            .recipes
            .read()
            .await
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .count())
    }

    async fn create(&self, recipe: Recipe) -> RepositoryResult<Recipe> {
        let mut recipes = self.recipes.write().await;
        if recipes.contains_key(&recipe.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        recipes.insert(recipe.id.clone(), recipe.clone());
        Ok(recipe)
    }

    async fn update(&self, recipe: Recipe) -> RepositoryResult<Recipe> {
        let mut recipes = self.recipes.write().await;
        match recipes.get_mut(&recipe.id) {
            Some(existing) => {
                *existing = recipe.clone();
                Ok(recipe)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.recipes
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl IngredientRepository for InMemoryIngredientRepository {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Ingredient>> {
        Ok(self.ingredients.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Ingredient>> {
        Ok(pick(&*self.ingredients.read().await, ids))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Ingredient>> {
        Ok(self.ingredients.read().await.values().cloned().collect())
    }

    async fn search_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Ingredient>> {
        Ok(self
            .ingredients
            .read()
            .await
            .values()
            .filter(|ingredient| ingredient.matches_prefix(prefix))
            .cloned()
            .collect())
    }

    async fn create(&self, ingredient: Ingredient) -> RepositoryResult<Ingredient> {
        let mut ingredients = self.ingredients.write().await;
        if ingredients.contains_key(&ingredient.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        ingredients.insert(ingredient.id.clone(), ingredient.clone());
        Ok(ingredient)
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Tag>> {
        Ok(self.tags.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Tag>> {
        Ok(pick(&*self.tags.read().await, ids))
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>> {
        Ok(self
            .tags
            .read()
            .await
            .values()
            .find(|tag| tag.slug == slug)
            .cloned())
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Tag>> {
        Ok(self.tags.read().await.values().cloned().collect())
    }

    async fn create(&self, tag: Tag) -> RepositoryResult<Tag> {
        let mut tags = self.tags.write().await;
        if tags.contains_key(&tag.id) || tags.values().any(|existing| existing.slug == tag.slug) {
            return Err(RepositoryError::AlreadyExists);
        }
        tags.insert(tag.id.clone(), tag.clone());
        Ok(tag)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<User>> {
        Ok(pick(&*self.users.read().await, ids))
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_all(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id)
            || users.values().any(|existing| existing.username == user.username)
        {
            return Err(RepositoryError::AlreadyExists);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RelationRepository for InMemoryRelationRepository {
    async fn insert(&self, relation: Relation) -> RepositoryResult<Relation> {
        let key = (
            relation.user_id.clone(),
            relation.kind,
            relation.target_id.clone(),
        );
        let mut relations = self.relations.write().await;
        if relations.contains_key(&key) {
            return Err(RepositoryError::AlreadyExists);
        }
        relations.insert(key, relation.clone());
        Ok(relation)
    }

    async fn remove(
        &self,
        user_id: &str,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<()> {
        let key = (user_id.to_string(), kind, target_id.to_string());
        self.relations
            .write()
            .await
            .shift_remove(&key)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn exists(
        &self,
        user_id: &str,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<bool> {
        let key = (user_id.to_string(), kind, target_id.to_string());
        Ok(self.relations.read().await.contains_key(&key))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        kind: RelationKind,
    ) -> RepositoryResult<Vec<Relation>> {
        Ok(self
            .relations
            .read()
            .await
            .values()
            .filter(|relation| relation.user_id == user_id && relation.kind == kind)
            .cloned()
            .collect())
    }

    async fn delete_by_target(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<usize> {
        let mut relations = self.relations.write().await;
        let before = relations.len();
        relations.retain(|_, relation| !(relation.kind == kind && relation.target_id == target_id));
        Ok(before - relations.len())
    }
}
