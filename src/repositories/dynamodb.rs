use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};

/// Raw DynamoDB item
pub type Item = HashMap<String, AttributeValue>;

/// BatchGetItem accepts at most 100 keys per request
const BATCH_GET_LIMIT: usize = 100;

/// Create a DynamoDB client span with X-Ray and OpenTelemetry attributes
pub(crate) fn dynamodb_span(table_name: &str, region: &str, operation: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        // AWS X-Ray specific attributes
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,
        "aws.agent" = "rust-aws-sdk",

        // Resource identification for X-Ray
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,

        "table.name" = %table_name,
        "endpoint" = format!("https://dynamodb.{}.amazonaws.com", region),

        // OpenTelemetry semantic conventions
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),

        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,

        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,

        "component" = "aws-sdk-dynamodb",
    )
}

/// Convert a DynamoDB error into a RepositoryError
pub(crate) fn map_dynamodb_error(table_name: &str, error: DynamoDbError) -> RepositoryError {
    match error {
        DynamoDbError::ResourceNotFoundException(_) => {
            error!("DynamoDB table not found: {}", table_name);
            RepositoryError::TableNotFound {
                table_name: table_name.to_string(),
            }
        }
        DynamoDbError::ConditionalCheckFailedException(e) => RepositoryError::ConstraintViolation {
            message: e.to_string(),
        },
        DynamoDbError::ProvisionedThroughputExceededException(_)
        | DynamoDbError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
        other => {
            error!("DynamoDB error: {:?}", other);
            RepositoryError::AwsSdk {
                message: other.to_string(),
            }
        }
    }
}

/// Replace a failed condition check with an operation-specific error
pub(crate) fn on_condition_failed(
    error: RepositoryError,
    replacement: RepositoryError,
) -> RepositoryError {
    match error {
        RepositoryError::ConstraintViolation { .. } => replacement,
        other => other,
    }
}

pub(crate) fn string_attr(item: &Item, key: &str) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Missing {}", key),
        })
}

pub(crate) fn number_attr<T: FromStr>(item: &Item, key: &str) -> RepositoryResult<T> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

pub(crate) fn datetime_attr(item: &Item, key: &str) -> RepositoryResult<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

pub(crate) fn string_list_attr(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_l().ok())
        .map(|list| {
            list.iter()
                .filter_map(|value| value.as_s().ok().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Scan a whole table, following `LastEvaluatedKey`
pub(crate) async fn scan_all(
    client: &DynamoDbClient,
    table_name: &str,
    filter: Option<(&str, Item)>,
) -> RepositoryResult<Vec<Item>> {
    let mut items = Vec::new();
    let mut start_key: Option<Item> = None;

    loop {
        let mut request = client
            .scan()
            .table_name(table_name)
            .set_exclusive_start_key(start_key.take());

        if let Some((expression, values)) = &filter {
            request = request
                .filter_expression(*expression)
                .set_expression_attribute_values(Some(values.clone()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

        items.extend(response.items.unwrap_or_default());

        match response.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(items)
}

/// Run a key-condition query to completion, following `LastEvaluatedKey`
pub(crate) async fn query_all(
    client: &DynamoDbClient,
    table_name: &str,
    index_name: Option<&str>,
    key_condition: &str,
    values: Item,
) -> RepositoryResult<Vec<Item>> {
    let mut items = Vec::new();
    let mut start_key: Option<Item> = None;

    loop {
        let response = client
            .query()
            .table_name(table_name)
            .set_index_name(index_name.map(str::to_string))
            .key_condition_expression(key_condition)
            .set_expression_attribute_values(Some(values.clone()))
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

        items.extend(response.items.unwrap_or_default());

        match response.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(items)
}

/// Fetch items by their string hash key, retrying unprocessed keys.
/// Result order is unspecified.
pub(crate) async fn batch_get_by_key(
    client: &DynamoDbClient,
    table_name: &str,
    key_name: &str,
    ids: &[String],
) -> RepositoryResult<Vec<Item>> {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();
    let mut items = Vec::new();

    for chunk in unique.chunks(BATCH_GET_LIMIT) {
        let keys: Vec<Item> = chunk
            .iter()
            .map(|id| HashMap::from([(key_name.to_string(), AttributeValue::S((*id).clone()))]))
            .collect();

        let keys_and_attributes = KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build batch get request: {}", e),
            })?;

        let mut pending = Some(HashMap::from([(
            table_name.to_string(),
            keys_and_attributes,
        )]));

        while let Some(request_items) = pending.take().filter(|m| !m.is_empty()) {
            let response = client
                .batch_get_item()
                .set_request_items(Some(request_items))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

            if let Some(found) = response
                .responses
                .and_then(|mut responses| responses.remove(table_name))
            {
                items.extend(found);
            }

            pending = response.unprocessed_keys;
        }
    }

    Ok(items)
}
