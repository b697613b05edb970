use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{
    datetime_attr, dynamodb_span, map_dynamodb_error, on_condition_failed, query_all,
    string_attr, Item,
};
use crate::models::{Relation, RelationKind, RepositoryError, RepositoryResult};

/// Name of the GSI keyed by `target_id` / `user_id`
pub const TARGET_INDEX: &str = "TargetIndex";

/// Favorites, cart entries and follows. Each `(user, kind, target)` is stored
/// at most once; the storage layer enforces it with conditional writes.
#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Insert a relation; fails with AlreadyExists if the pair is present
    async fn insert(&self, relation: Relation) -> RepositoryResult<Relation>;

    /// Remove a relation; fails with NotFound if the pair is absent
    async fn remove(&self, user_id: &str, kind: RelationKind, target_id: &str)
        -> RepositoryResult<()>;

    async fn exists(&self, user_id: &str, kind: RelationKind, target_id: &str)
        -> RepositoryResult<bool>;

    /// Relations of one kind for a user, in the order they were added
    async fn list_for_user(&self, user_id: &str, kind: RelationKind)
        -> RepositoryResult<Vec<Relation>>;

    /// Remove every relation of `kind` pointing at `target_id`; returns the count
    async fn delete_by_target(&self, kind: RelationKind, target_id: &str)
        -> RepositoryResult<usize>;
}

/// DynamoDB implementation of the RelationRepository trait
pub struct DynamoDbRelationRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbRelationRepository {
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

    fn key(&self, user_id: &str, kind: RelationKind, target_id: &str) -> Item {
        HashMap::from([
            ("user_id".to_string(), AttributeValue::S(user_id.to_string())),
            (
                "relation_key".to_string(),
                AttributeValue::S(kind.sort_key(target_id)),
            ),
        ])
    }

    pub fn relation_to_item(&self, relation: &Relation) -> Item {
        let mut item = self.key(&relation.user_id, relation.kind, &relation.target_id);
        item.insert(
            "kind".to_string(),
            AttributeValue::S(relation.kind.to_string()),
        );
        item.insert(
            "target_id".to_string(),
            AttributeValue::S(relation.target_id.clone()),
        );
        item.insert(
            "added_at".to_string(),
            AttributeValue::S(relation.added_at.to_rfc3339()),
        );
        item
    }

    pub fn item_to_relation(&self, item: &Item) -> RepositoryResult<Relation> {
        let kind: RelationKind = string_attr(item, "kind")?
            .parse()
            .map_err(|message| RepositoryError::InvalidItem { message })?;

        Ok(Relation {
            user_id: string_attr(item, "user_id")?,
            kind,
            target_id: string_attr(item, "target_id")?,
            added_at: datetime_attr(item, "added_at")?,
        })
    }

    fn parse_items(&self, items: Vec<Item>) -> Vec<Relation> {
        items
            .iter()
            .filter_map(|item| match self.item_to_relation(item) {
                Ok(relation) => Some(relation),
                Err(e) => {
                    warn!("Failed to parse relation item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl RelationRepository for DynamoDbRelationRepository {
    #[instrument(skip(self, relation), fields(table = %self.table_name, user_id = %relation.user_id, kind = %relation.kind, target_id = %relation.target_id))]
    async fn insert(&self, relation: Relation) -> RepositoryResult<Relation> {
        let item = self.relation_to_item(&relation);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(user_id)")
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

        info!("Relation added");
        Ok(relation)
    }

    #[instrument(skip(self), fields(table = %self.table_name, kind = %kind))]
    async fn remove(
        &self,
        user_id: &str,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<()> {
        let delete_span = self.create_dynamodb_span("DeleteItem");

        async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .set_key(Some(self.key(user_id, kind, target_id)))
                .condition_expression("attribute_exists(user_id)")
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

        info!("Relation removed");
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table_name, kind = %kind))]
    async fn exists(
        &self,
        user_id: &str,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<bool> {
        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .set_key(Some(self.key(user_id, kind, target_id)))
                .projection_expression("user_id")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(get_span)
        .await?;

        Ok(response.item.is_some())
    }

    #[instrument(skip(self), fields(table = %self.table_name, kind = %kind))]
    async fn list_for_user(
        &self,
        user_id: &str,
        kind: RelationKind,
    ) -> RepositoryResult<Vec<Relation>> {
        let query_span = self.create_dynamodb_span("Query");
        let items = query_all(
            &self.client,
            &self.table_name,
            None,
            "user_id = :user_id AND begins_with(relation_key, :prefix)",
            HashMap::from([
                (
                    ":user_id".to_string(),
                    AttributeValue::S(user_id.to_string()),
                ),
                (
                    ":prefix".to_string(),
                    AttributeValue::S(kind.sort_key_prefix()),
                ),
            ]),
        )
        .instrument(query_span)
        .await?;

        let mut relations = self.parse_items(items);
        relations.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });

        info!("Found {} relations", relations.len());
        Ok(relations)
    }

    #[instrument(skip(self), fields(table = %self.table_name, kind = %kind, target_id = %target_id))]
    async fn delete_by_target(
        &self,
        kind: RelationKind,
        target_id: &str,
    ) -> RepositoryResult<usize> {
        let query_span = self.create_dynamodb_span("Query");
        let items = query_all(
            &self.client,
            &self.table_name,
            Some(TARGET_INDEX),
            "target_id = :target_id",
            HashMap::from([(
                ":target_id".to_string(),
                AttributeValue::S(target_id.to_string()),
            )]),
        )
        .instrument(query_span)
        .await?;

        let relations: Vec<Relation> = self
            .parse_items(items)
            .into_iter()
            .filter(|relation| relation.kind == kind)
            .collect();

        for relation in &relations {
            let delete_span = self.create_dynamodb_span("DeleteItem");
            async {
                self.client
                    .delete_item()
                    .table_name(&self.table_name)
                    .set_key(Some(self.key(
                        &relation.user_id,
                        relation.kind,
                        &relation.target_id,
                    )))
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
            }
            .instrument(delete_span)
            .await?;
        }

        info!("Removed {} relations", relations.len());
        Ok(relations.len())
    }
}
