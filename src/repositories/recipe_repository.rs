use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    batch_get_by_key, datetime_attr, dynamodb_span, map_dynamodb_error, number_attr,
    on_condition_failed, query_all, scan_all, string_attr, string_list_attr, Item,
};
use crate::models::{IngredientLine, Recipe, RepositoryError, RepositoryResult};

/// Name of the GSI keyed by `author_id` / `created_at`
pub const AUTHOR_INDEX: &str = "AuthorIndex";

/// Trait defining the interface for recipe data access operations
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Find a recipe by its ID
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Recipe>>;

    /// Find several recipes at once; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Recipe>>;

    /// All recipes, unordered
    async fn find_all(&self) -> RepositoryResult<Vec<Recipe>>;

    /// Recipes of one author, oldest first
    async fn find_by_author(&self, author_id: &str) -> RepositoryResult<Vec<Recipe>>;

    /// Number of recipes of one author
    async fn count_by_author(&self, author_id: &str) -> RepositoryResult<usize>;

    /// Insert a new recipe; fails with AlreadyExists on id collision
    async fn create(&self, recipe: Recipe) -> RepositoryResult<Recipe>;

    /// Replace an existing recipe in one write; fails with NotFound if it is gone
    async fn update(&self, recipe: Recipe) -> RepositoryResult<Recipe>;

    /// Delete a recipe; fails with NotFound if it does not exist
    async fn delete(&self, id: &str) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the RecipeRepository trait
pub struct DynamoDbRecipeRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbRecipeRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        dynamodb_span(&self.table_name, &self.region, operation)
    }

    /// Convert a Recipe into DynamoDB attribute values
    pub fn recipe_to_item(&self, recipe: &Recipe) -> Item {
        let mut item = HashMap::new();

        item.insert("id".to_string(), AttributeValue::S(recipe.id.clone()));
        item.insert(
            "author_id".to_string(),
            AttributeValue::S(recipe.author_id.clone()),
        );
        item.insert("name".to_string(), AttributeValue::S(recipe.name.clone()));
        item.insert("image".to_string(), AttributeValue::S(recipe.image.clone()));
        item.insert("text".to_string(), AttributeValue::S(recipe.text.clone()));
        item.insert(
            "cooking_time".to_string(),
            AttributeValue::N(recipe.cooking_time.to_string()),
        );

        let lines: Vec<AttributeValue> = recipe
            .ingredients
            .iter()
            .map(|line| {
                AttributeValue::M(HashMap::from([
                    (
                        "ingredient_id".to_string(),
                        AttributeValue::S(line.ingredient_id.clone()),
                    ),
                    (
                        "amount".to_string(),
                        AttributeValue::N(line.amount.to_string()),
                    ),
                ]))
            })
            .collect();
        item.insert("ingredients".to_string(), AttributeValue::L(lines));

        item.insert(
            "tag_ids".to_string(),
            AttributeValue::L(
                recipe
                    .tag_ids
                    .iter()
                    .map(|id| AttributeValue::S(id.clone()))
                    .collect(),
            ),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(recipe.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(recipe.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert a DynamoDB item into a Recipe
    pub fn item_to_recipe(&self, item: &Item) -> RepositoryResult<Recipe> {
        let ingredients = item
            .get("ingredients")
            .and_then(|v| v.as_l().ok())
            .ok_or_else(|| RepositoryError::InvalidItem {
                message: "Missing ingredients".to_string(),
            })?
            .iter()
            .map(|value| -> RepositoryResult<IngredientLine> {
                let line = value.as_m().map_err(|_| RepositoryError::InvalidItem {
                    message: "Ingredient line is not a map".to_string(),
                })?;
                Ok(IngredientLine {
                    ingredient_id: string_attr(line, "ingredient_id")?,
                    amount: number_attr(line, "amount")?,
                })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        let created_at = datetime_attr(item, "created_at")?;
        let updated_at = datetime_attr(item, "updated_at").unwrap_or(created_at);

        Ok(Recipe {
            id: string_attr(item, "id")?,
            author_id: string_attr(item, "author_id")?,
            name: string_attr(item, "name")?,
            image: string_attr(item, "image")?,
            text: string_attr(item, "text")?,
            cooking_time: number_attr(item, "cooking_time")?,
            ingredients,
            tag_ids: string_list_attr(item, "tag_ids"),
            created_at,
            updated_at,
        })
    }

    fn parse_items(&self, items: Vec<Item>) -> Vec<Recipe> {
        items
            .iter()
            .filter_map(|item| match self.item_to_recipe(item) {
                Ok(recipe) => Some(recipe),
                Err(e) => {
                    warn!("Failed to parse recipe item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl RecipeRepository for DynamoDbRecipeRepository {
    #[instrument(skip(self), fields(table = %self.table_name, recipe_id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Recipe>> {
        info!("Finding recipe by ID");

        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => Ok(Some(self.item_to_recipe(&item)?)),
            None => {
                info!("Recipe not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, ids), fields(table = %self.table_name, count = ids.len()))]
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let batch_span = self.create_dynamodb_span("BatchGetItem");
        let items = batch_get_by_key(&self.client, &self.table_name, "id", ids)
            .instrument(batch_span)
            .await?;

        let recipes = self.parse_items(items);
        info!("Found {} of {} recipes", recipes.len(), ids.len());
        Ok(recipes)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<Recipe>> {
        let scan_span = self.create_dynamodb_span("Scan");
        let items = scan_all(&self.client, &self.table_name, None)
            .instrument(scan_span)
            .await?;

        let recipes = self.parse_items(items);
        info!("Found {} recipes", recipes.len());
        Ok(recipes)
    }

    #[instrument(skip(self), fields(table = %self.table_name, author_id = %author_id))]
    async fn find_by_author(&self, author_id: &str) -> RepositoryResult<Vec<Recipe>> {
        let query_span = self.create_dynamodb_span("Query");
        let items = query_all(
            &self.client,
            &self.table_name,
            Some(AUTHOR_INDEX),
            "author_id = :author_id",
            HashMap::from([(
                ":author_id".to_string(),
                AttributeValue::S(author_id.to_string()),
            )]),
        )
        .instrument(query_span)
        .await?;

        let recipes = self.parse_items(items);
        info!("Found {} recipes for author", recipes.len());
        Ok(recipes)
    }

    #[instrument(skip(self), fields(table = %self.table_name, author_id = %author_id))]
    async fn count_by_author(&self, author_id: &str) -> RepositoryResult<usize> {
        let query_span = self.create_dynamodb_span("Query");

        async {
            let mut count = 0usize;
            let mut start_key: Option<Item> = None;

            loop {
                let response = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .index_name(AUTHOR_INDEX)
                    .key_condition_expression("author_id = :author_id")
                    .expression_attribute_values(
                        ":author_id",
                        AttributeValue::S(author_id.to_string()),
                    )
                    .select(Select::Count)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))?;

                count += response.count() as usize;

                match response.last_evaluated_key {
                    Some(key) if !key.is_empty() => start_key = Some(key),
                    _ => break,
                }
            }

            Ok::<usize, RepositoryError>(count)
        }
        .instrument(query_span)
        .await
    }

    #[instrument(skip(self, recipe), fields(table = %self.table_name, recipe_id = %recipe.id))]
    async fn create(&self, recipe: Recipe) -> RepositoryResult<Recipe> {
        info!("Creating recipe");

        let item = self.recipe_to_item(&recipe);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| {
                    on_condition_failed(
                        map_dynamodb_error(&self.table_name, e.into()),
                        RepositoryError::AlreadyExists,
                    )
                })
        }
        .instrument(put_span)
        .await?;

        info!("Recipe created");
        Ok(recipe)
    }

    #[instrument(skip(self, recipe), fields(table = %self.table_name, recipe_id = %recipe.id))]
    async fn update(&self, recipe: Recipe) -> RepositoryResult<Recipe> {
        info!("Replacing recipe");

        let item = self.recipe_to_item(&recipe);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_exists(id)")
                .send()
                .await
                .map_err(|e| {
                    on_condition_failed(
                        map_dynamodb_error(&self.table_name, e.into()),
                        RepositoryError::NotFound,
                    )
                })
        }
        .instrument(put_span)
        .await?;

        info!("Recipe updated");
        Ok(recipe)
    }

    #[instrument(skip(self), fields(table = %self.table_name, recipe_id = %id))]
    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        info!("Deleting recipe");

        let delete_span = self.create_dynamodb_span("DeleteItem");

        async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .condition_expression("attribute_exists(id)")
                .send()
                .await
                .map_err(|e| {
                    on_condition_failed(
                        map_dynamodb_error(&self.table_name, e.into()),
                        RepositoryError::NotFound,
                    )
                })
        }
        .instrument(delete_span)
        .await?;

        info!("Recipe deleted");
        Ok(())
    }
}
