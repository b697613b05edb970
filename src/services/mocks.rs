use async_trait::async_trait;
use mockall::mock;

use crate::models::{Ingredient, Recipe, Relation, RelationKind, RepositoryResult, Tag, User};
use crate::repositories::{
    IngredientRepository, RecipeRepository, RelationRepository, TagRepository, UserRepository,
};

mock! {
    pub RecipeRepo {}

    #[async_trait]
    impl RecipeRepository for RecipeRepo {
        async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Recipe>>;
        async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Recipe>>;
        async fn find_all(&self) -> RepositoryResult<Vec<Recipe>>;
        async fn find_by_author(&self, author_id: &str) -> RepositoryResult<Vec<Recipe>>;
        async fn count_by_author(&self, author_id: &str) -> RepositoryResult<usize>;
        async fn create(&self, recipe: Recipe) -> RepositoryResult<Recipe>;
        async fn update(&self, recipe: Recipe) -> RepositoryResult<Recipe>;
        async fn delete(&self, id: &str) -> RepositoryResult<()>;
    }
}

mock! {
    pub IngredientRepo {}

    #[async_trait]
    impl IngredientRepository for IngredientRepo {
        async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Ingredient>>;
        async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Ingredient>>;
        async fn find_all(&self) -> RepositoryResult<Vec<Ingredient>>;
        async fn search_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Ingredient>>;
        async fn create(&self, ingredient: Ingredient) -> RepositoryResult<Ingredient>;
    }
}

mock! {
    pub TagRepo {}

    #[async_trait]
    impl TagRepository for TagRepo {
        async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Tag>>;
        async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Tag>>;
        async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>>;
        async fn find_all(&self) -> RepositoryResult<Vec<Tag>>;
        async fn create(&self, tag: Tag) -> RepositoryResult<Tag>;
    }
}

mock! {
    pub UserRepo {}

    #[async_trait]
    impl UserRepository for UserRepo {
        async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>>;
        async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<User>>;
        async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;
        async fn find_all(&self) -> RepositoryResult<Vec<User>>;
        async fn create(&self, user: User) -> RepositoryResult<User>;
    }
}

mock! {
    pub RelationRepo {}

    #[async_trait]
    impl RelationRepository for RelationRepo {
        async fn insert(&self, relation: Relation) -> RepositoryResult<Relation>;
        async fn remove(&self, user_id: &str, kind: RelationKind, target_id: &str) -> RepositoryResult<()>;
        async fn exists(&self, user_id: &str, kind: RelationKind, target_id: &str) -> RepositoryResult<bool>;
        async fn list_for_user(&self, user_id: &str, kind: RelationKind) -> RepositoryResult<Vec<Relation>>;
        async fn delete_by_target(&self, kind: RelationKind, target_id: &str) -> RepositoryResult<usize>;
    }
}
