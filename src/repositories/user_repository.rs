use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    batch_get_by_key, datetime_attr, dynamodb_span, map_dynamodb_error, on_condition_failed,
    query_all, scan_all, string_attr, Item,
};
use crate::models::{RepositoryError, RepositoryResult, User};

/// Name of the users GSI keyed by `username`
pub const USERNAME_INDEX: &str = "UsernameIndex";

/// Trait defining the interface for user profile data access
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>>;

    /// Find several users at once; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<User>>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// All users, unordered
    async fn find_all(&self) -> RepositoryResult<Vec<User>>;

    async fn create(&self, user: User) -> RepositoryResult<User>;
}

/// DynamoDB implementation of the UserRepository trait
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbUserRepository {
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

    pub fn user_to_item(&self, user: &User) -> Item {
        HashMap::from([
            ("id".to_string(), AttributeValue::S(user.id.clone())),
            ("email".to_string(), AttributeValue::S(user.email.clone())),
            ("username".to_string(), AttributeValue::S(user.username.clone())),
            (
                "first_name".to_string(),
                AttributeValue::S(user.first_name.clone()),
            ),
            (
                "last_name".to_string(),
                AttributeValue::S(user.last_name.clone()),
            ),
            (
                "created_at".to_string(),
                AttributeValue::S(user.created_at.to_rfc3339()),
            ),
        ])
    }

    pub fn item_to_user(&self, item: &Item) -> RepositoryResult<User> {
        Ok(User {
            id: string_attr(item, "id")?,
            email: string_attr(item, "email")?,
            username: string_attr(item, "username")?,
            first_name: string_attr(item, "first_name")?,
            last_name: string_attr(item, "last_name")?,
            created_at: datetime_attr(item, "created_at")?,
        })
    }

    fn parse_items(&self, items: Vec<Item>) -> Vec<User> {
        items
            .iter()
            .filter_map(|item| match self.item_to_user(item) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Failed to parse user item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self), fields(table = %self.table_name, user_id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
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

        response.item.map(|item| self.item_to_user(&item)).transpose()
    }

    #[instrument(skip(self, ids), fields(table = %self.table_name, count = ids.len()))]
    async fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let batch_span = self.create_dynamodb_span("BatchGetItem");
        let items = batch_get_by_key(&self.client, &self.table_name, "id", ids)
            .instrument(batch_span)
            .await?;

        Ok(self.parse_items(items))
    }

    #[instrument(skip(self), fields(table = %self.table_name, username = %username))]
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let query_span = self.create_dynamodb_span("Query");
        let items = query_all(
            &self.client,
            &self.table_name,
            Some(USERNAME_INDEX),
            "username = :username",
            HashMap::from([(
                ":username".to_string(),
                AttributeValue::S(username.to_string()),
            )]),
        )
        .instrument(query_span)
        .await?;

        Ok(self.parse_items(items).into_iter().next())
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<User>> {
        let scan_span = self.create_dynamodb_span("Scan");
        let items = scan_all(&self.client, &self.table_name, None)
            .instrument(scan_span)
            .await?;

        let users = self.parse_items(items);
        info!("Found {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self, user), fields(table = %self.table_name, user_id = %user.id))]
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let item = self.user_to_item(&user);
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

        info!("User created");
        Ok(user)
    }
}
