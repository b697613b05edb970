use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::catalog_repository::SLUG_INDEX;
use super::dynamodb::map_dynamodb_error;
use super::recipe_repository::AUTHOR_INDEX;
use super::relation_repository::TARGET_INDEX;
use super::user_repository::USERNAME_INDEX;
use crate::config::DatabaseConfig;
use crate::models::{RepositoryError, RepositoryResult};

/// Key layout of one table: hash key, optional range key and GSIs.
/// Every key attribute is a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table_name: String,
    pub hash_key: &'static str,
    pub range_key: Option<&'static str>,
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub index_name: &'static str,
    pub hash_key: &'static str,
    pub range_key: Option<&'static str>,
}

impl TableSpec {
    /// Layout of every table named in the database configuration
    pub fn all(config: &DatabaseConfig) -> Vec<TableSpec> {
        vec![
            TableSpec {
                table_name: config.recipes_table_name.clone(),
                hash_key: "id",
                range_key: None,
                indexes: vec![IndexSpec {
                    index_name: AUTHOR_INDEX,
                    hash_key: "author_id",
                    range_key: Some("created_at"),
                }],
            },
            TableSpec {
                table_name: config.ingredients_table_name.clone(),
                hash_key: "id",
                range_key: None,
                indexes: vec![],
            },
            TableSpec {
                table_name: config.tags_table_name.clone(),
                hash_key: "id",
                range_key: None,
                indexes: vec![IndexSpec {
                    index_name: SLUG_INDEX,
                    hash_key: "slug",
                    range_key: None,
                }],
            },
            TableSpec {
                table_name: config.users_table_name.clone(),
                hash_key: "id",
                range_key: None,
                indexes: vec![IndexSpec {
                    index_name: USERNAME_INDEX,
                    hash_key: "username",
                    range_key: None,
                }],
            },
            TableSpec {
                table_name: config.relations_table_name.clone(),
                hash_key: "user_id",
                range_key: Some("relation_key"),
                indexes: vec![IndexSpec {
                    index_name: TARGET_INDEX,
                    hash_key: "target_id",
                    range_key: Some("user_id"),
                }],
            },
        ]
    }

    /// Distinct attribute names used by the table key and its indexes
    pub fn key_attributes(&self) -> Vec<&'static str> {
        let mut attributes = vec![self.hash_key];
        attributes.extend(self.range_key);
        for index in &self.indexes {
            attributes.push(index.hash_key);
            attributes.extend(index.range_key);
        }

        let mut unique = Vec::new();
        for attribute in attributes {
            if !unique.contains(&attribute) {
                unique.push(attribute);
            }
        }
        unique
    }
}

fn build_error(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::AwsSdk {
        message: format!("Failed to build {}: {}", what, e),
    }
}

fn key_schema(hash_key: &str, range_key: Option<&str>) -> RepositoryResult<Vec<KeySchemaElement>> {
    let mut schema = vec![KeySchemaElement::builder()
        .attribute_name(hash_key)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| build_error("key schema", e))?];

    if let Some(range_key) = range_key {
        schema.push(
            KeySchemaElement::builder()
                .attribute_name(range_key)
                .key_type(KeyType::Range)
                .build()
                .map_err(|e| build_error("key schema", e))?,
        );
    }

    Ok(schema)
}

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self { client }
    }

    /// Create a table with its GSIs unless it already exists
    #[instrument(skip(self, spec), fields(table_name = %spec.table_name))]
    pub async fn create_table(&self, spec: &TableSpec) -> RepositoryResult<()> {
        if self.table_exists(&spec.table_name).await? {
            info!("Table {} already exists", spec.table_name);
            return Ok(());
        }

        info!("Creating table");

        let attribute_definitions = spec
            .key_attributes()
            .into_iter()
            .map(|name| {
                AttributeDefinition::builder()
                    .attribute_name(name)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(|e| build_error("attribute definition", e))
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        let indexes = spec
            .indexes
            .iter()
            .map(|index| {
                GlobalSecondaryIndex::builder()
                    .index_name(index.index_name)
                    .set_key_schema(Some(key_schema(index.hash_key, index.range_key)?))
                    .projection(
                        Projection::builder()
                            .projection_type(ProjectionType::All)
                            .build(),
                    )
                    .build()
                    .map_err(|e| build_error("GSI", e))
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        self.client
            .create_table()
            .table_name(&spec.table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema(spec.hash_key, spec.range_key)?))
            .set_global_secondary_indexes((!indexes.is_empty()).then_some(indexes))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(&spec.table_name, e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(&spec.table_name).await?;
        info!("Table {} created successfully", spec.table_name);

        Ok(())
    }

    /// Create every table the service needs; returns the table names
    #[instrument(skip(self, config))]
    pub async fn create_all_tables(&self, config: &DatabaseConfig) -> RepositoryResult<Vec<String>> {
        let specs = TableSpec::all(config);

        for spec in &specs {
            self.create_table(spec).await?;
        }

        info!("All tables ready");
        Ok(specs.into_iter().map(|spec| spec.table_name).collect())
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error()
                    .map(|service_error| service_error.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", e);
                    Err(RepositoryError::ConnectionFailed)
                }
            }
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let max_attempts = 30;
        let wait_duration = Duration::from_secs(10);

        for _ in 0..max_attempts {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(wait_duration).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            storage_backend: crate::config::StorageBackend::Dynamodb,
            recipes_table_name: "Recipes".to_string(),
            ingredients_table_name: "Ingredients".to_string(),
            tags_table_name: "Tags".to_string(),
            users_table_name: "Users".to_string(),
            relations_table_name: "Relations".to_string(),
            region: "us-east-1".to_string(),
            dynamodb_endpoint_url: None,
        }
    }

    #[test]
    fn test_all_specs_cover_every_table() {
        let names: Vec<String> = TableSpec::all(&database_config())
            .into_iter()
            .map(|spec| spec.table_name)
            .collect();
        assert_eq!(
            names,
            vec!["Recipes", "Ingredients", "Tags", "Users", "Relations"]
        );
    }

    #[test]
    fn test_relations_key_attributes_are_deduplicated() {
        let specs = TableSpec::all(&database_config());
        let relations = specs
            .iter()
            .find(|spec| spec.table_name == "Relations")
            .unwrap();

        assert_eq!(
            relations.key_attributes(),
            vec!["user_id", "relation_key", "target_id"]
        );
    }

    #[test]
    fn test_key_schema_with_range_key() {
        let schema = key_schema("author_id", Some("created_at")).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].key_type(), &KeyType::Hash);
        assert_eq!(schema[1].attribute_name(), "created_at");
    }

    #[test]
    fn test_table_manager_creation() {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        let _manager = TableManager::new(client);
    }
}
