// Repositories module - data access layer

use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;

use crate::config::{DatabaseConfig, StorageBackend};

pub mod catalog_repository;
pub(crate) mod dynamodb;
pub mod memory;
pub mod recipe_repository;
pub mod relation_repository;
pub mod table_manager;
pub mod user_repository;


pub use catalog_repository::{
    DynamoDbIngredientRepository, DynamoDbTagRepository, IngredientRepository, TagRepository,
};
pub use memory::{
    InMemoryIngredientRepository, InMemoryRecipeRepository, InMemoryRelationRepository,
    InMemoryTagRepository, InMemoryUserRepository,
};
pub use recipe_repository::{DynamoDbRecipeRepository, RecipeRepository};
pub use relation_repository::{DynamoDbRelationRepository, RelationRepository};
pub use table_manager::{TableManager, TableSpec};
pub use user_repository::{DynamoDbUserRepository, UserRepository};

/// One handle per aggregate, shared by every service
#[derive(Clone)]
pub struct Repositories {
    pub recipes: Arc<dyn RecipeRepository>,
    pub ingredients: Arc<dyn IngredientRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub relations: Arc<dyn RelationRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            recipes: Arc::new(InMemoryRecipeRepository::default()),
            ingredients: Arc::new(InMemoryIngredientRepository::default()),
            tags: Arc::new(InMemoryTagRepository::default()),
            users: Arc::new(InMemoryUserRepository::default()),
            relations: Arc::new(InMemoryRelationRepository::default()),
        }
    }

    pub fn dynamodb(client: Arc<DynamoDbClient>, config: &DatabaseConfig) -> Self {
        Self {
            recipes: Arc::new(DynamoDbRecipeRepository::new(
                client.clone(),
                config.recipes_table_name.clone(),
                config.region.clone(),
            )),
            ingredients: Arc::new(DynamoDbIngredientRepository::new(
                client.clone(),
                config.ingredients_table_name.clone(),
                config.region.clone(),
            )),
            tags: Arc::new(DynamoDbTagRepository::new(
                client.clone(),
                config.tags_table_name.clone(),
                config.region.clone(),
            )),
            users: Arc::new(DynamoDbUserRepository::new(
                client.clone(),
                config.users_table_name.clone(),
                config.region.clone(),
            )),
            relations: Arc::new(DynamoDbRelationRepository::new(
                client,
                config.relations_table_name.clone(),
                config.region.clone(),
            )),
        }
    }

    /// Repositories for the configured backend. The DynamoDB client is
    /// returned too so callers can manage tables with it.
    pub async fn from_config(config: &DatabaseConfig) -> (Self, Option<Arc<DynamoDbClient>>) {
        match config.storage_backend {
            StorageBackend::Memory => (Self::in_memory(), None),
            StorageBackend::Dynamodb => {
                let client = Arc::new(config.dynamodb_client().await);
                (Self::dynamodb(client.clone(), config), Some(client))
            }
        }
    }
}
