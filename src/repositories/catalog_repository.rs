use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    batch_get_by_key, dynamodb_span, map_dynamodb_error, on_condition_failed, query_all,
    scan_all, string_attr, Item,
};
use crate::models::{Ingredient, RepositoryError, RepositoryResult, Tag};

/// Name of the tags GSI keyed by `slug`
pub const SLUG_INDEX: &str = "SlugIndex";

/// Read/write access to ingredient reference data
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Ingredient>>;

    /// Find several ingredients at once; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Ingredient>>;

    /// All ingredients, unordered
    async fn find_all(&self) -> RepositoryResult<Vec<Ingredient>>;

    /// Ingredients whose name starts with `prefix`, ignoring case
    async fn search_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Ingredient>>;

    async fn create(&self, ingredient: Ingredient) -> RepositoryResult<Ingredient>;
}

/// Read/write access to recipe tags
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Tag>>;

    /// Find several tags at once; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Tag>>;

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>>;

    /// All tags, unordered
    async fn find_all(&self) -> RepositoryResult<Vec<Tag>>;

    async fn create(&self, tag: Tag) -> RepositoryResult<Tag>;
}

/// DynamoDB implementation of the IngredientRepository trait
pub struct DynamoDbIngredientRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

/// DynamoDB implementation of the TagRepository trait
pub struct DynamoDbTagRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbIngredientRepository {
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

    /// `name_lower` backs the case-insensitive prefix search
    pub fn ingredient_to_item(&self, ingredient: &Ingredient) -> Item {
        HashMap::from([
            ("id".to_string(), AttributeValue::S(ingredient.id.clone())),
            ("name".to_string(), AttributeValue::S(ingredient.name.clone())),
            (
                "name_lower".to_string(),
                AttributeValue::S(ingredient.name.to_lowercase()),
            ),
            (
                "measurement_unit".to_string(),
                AttributeValue::S(ingredient.measurement_unit.clone()),
            ),
        ])
    }

    pub fn item_to_ingredient(&self, item: &Item) -> RepositoryResult<Ingredient> {
        Ok(Ingredient {
            id: string_attr(item, "id")?,
            name: string_attr(item, "name")?,
            measurement_unit: string_attr(item, "measurement_unit")?,
        })
    }

    fn parse_items(&self, items: Vec<Item>) -> Vec<Ingredient> {
        items
            .iter()
            .filter_map(|item| match self.item_to_ingredient(item) {
                Ok(ingredient) => Some(ingredient),
                Err(e) => {
                    warn!("Failed to parse ingredient item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl IngredientRepository for DynamoDbIngredientRepository {
    #[instrument(skip(self), fields(table = %self.table_name, ingredient_id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Ingredient>> {
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

        response
            .item
            .map(|item| self.item_to_ingredient(&item))
            .transpose()
    }

    #[instrument(skip(self, ids), fields(table = %self.table_name, count = ids.len()))]
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let batch_span = self.create_dynamodb_span("BatchGetItem");
        let items = batch_get_by_key(&self.client, &self.table_name, "id", ids)
            .instrument(batch_span)
            .await?;

        Ok(self.parse_items(items))
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<Ingredient>> {
        let scan_span = self.create_dynamodb_span("Scan");
        let items = scan_all(&self.client, &self.table_name, None)
            .instrument(scan_span)
            .await?;

        let ingredients = self.parse_items(items);
        info!("Found {} ingredients", ingredients.len());
        Ok(ingredients)
    }

    #[instrument(skip(self), fields(table = %self.table_name, prefix = %prefix))]
    async fn search_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Ingredient>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return self.find_all().await;
        }

        let scan_span = self.create_dynamodb_span("Scan");
        let items = scan_all(
            &self.client,
            &self.table_name,
            Some((
                "begins_with(name_lower, :prefix)",
                HashMap::from([(":prefix".to_string(), AttributeValue::S(prefix))]),
            )),
        )
        .instrument(scan_span)
        .await?;

        let ingredients = self.parse_items(items);
        info!("Found {} ingredients matching prefix", ingredients.len());
        Ok(ingredients)
    }

    #[instrument(skip(self, ingredient), fields(table = %self.table_name, name = %ingredient.name))]
    async fn create(&self, ingredient: Ingredient) -> RepositoryResult<Ingredient> {
        let item = self.ingredient_to_item(&ingredient);
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

        info!("Ingredient created");
        Ok(ingredient)
    }
}

impl DynamoDbTagRepository {
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

    pub fn tag_to_item(&self, tag: &Tag) -> Item {
        HashMap::from([
            ("id".to_string(), AttributeValue::S(tag.id.clone())),
            ("name".to_string(), AttributeValue::S(tag.name.clone())),
            ("color".to_string(), AttributeValue::S(tag.color.clone())),
            ("slug".to_string(), AttributeValue::S(tag.slug.clone())),
        ])
    }

    pub fn item_to_tag(&self, item: &Item) -> RepositoryResult<Tag> {
        Ok(Tag {
            id: string_attr(item, "id")?,
            name: string_attr(item, "name")?,
            color: string_attr(item, "color")?,
            slug: string_attr(item, "slug")?,
        })
    }

    fn parse_items(&self, items: Vec<Item>) -> Vec<Tag> {
        items
            .iter()
            .filter_map(|item| match self.item_to_tag(item) {
                Ok(tag) => Some(tag),
                Err(e) => {
                    warn!("Failed to parse tag item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl TagRepository for DynamoDbTagRepository {
    #[instrument(skip(self), fields(table = %self.table_name, tag_id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Tag>> {
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

        response.item.map(|item| self.item_to_tag(&item)).transpose()
    }

    #[instrument(skip(self, ids), fields(table = %self.table_name, count = ids.len()))]
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let batch_span = self.create_dynamodb_span("BatchGetItem");
        let items = batch_get_by_key(&self.client, &self.table_name, "id", ids)
            .instrument(batch_span)
            .await?;

        Ok(self.parse_items(items))
    }

    #[instrument(skip(self), fields(table = %self.table_name, slug = %slug))]
    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tag>> {
        let query_span = self.create_dynamodb_span("Query");
        let items = query_all(
            &self.client,
            &self.table_name,
            Some(SLUG_INDEX),
            "slug = :slug",
            HashMap::from([(":slug".to_string(), AttributeValue::S(slug.to_string()))]),
        )
        .instrument(query_span)
        .await?;

        Ok(self.parse_items(items).into_iter().next())
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<Tag>> {
        let scan_span = self.create_dynamodb_span("Scan");
        let items = scan_all(&self.client, &self.table_name, None)
            .instrument(scan_span)
            .await?;

        let tags = self.parse_items(items);
        info!("Found {} tags", tags.len());
        Ok(tags)
    }

    #[instrument(skip(self, tag), fields(table = %self.table_name, slug = %tag.slug))]
    async fn create(&self, tag: Tag) -> RepositoryResult<Tag> {
        let item = self.tag_to_item(&tag);
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

        info!("Tag created");
        Ok(tag)
    }
}
