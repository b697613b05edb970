use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "FOODGRAM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

/// Where repositories keep their data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Dynamodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_recipes_table")]
    pub recipes_table_name: String,
    #[serde(default = "default_ingredients_table")]
    pub ingredients_table_name: String,
    #[serde(default = "default_tags_table")]
    pub tags_table_name: String,
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_relations_table")]
    pub relations_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Override for DynamoDB Local or LocalStack
    #[serde(default)]
    pub dynamodb_endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_media_base_url")]
    pub media_base_url: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_otlp_endpoint_option")]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_enable_json_logging")]
    pub enable_json_logging: bool,
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let config = Config {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        for (name, value) in self.database.table_names() {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{} table name cannot be empty", name),
                });
            }
        }

        if self.api.media_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Media base URL cannot be empty".to_string(),
            });
        }

        if self.api.default_page_size == 0 || self.api.max_page_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Page sizes must be positive".to_string(),
            });
        }

        if self.api.default_page_size > self.api.max_page_size {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Default page size {} exceeds max page size {}",
                    self.api.default_page_size, self.api.max_page_size
                ),
            });
        }

        Ok(())
    }
}

fn load_section<T: serde::de::DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    /// `(label, table name)` pairs for every table the service uses
    pub fn table_names(&self) -> [(&'static str, &str); 5] {
        [
            ("Recipes", self.recipes_table_name.as_str()),
            ("Ingredients", self.ingredients_table_name.as_str()),
            ("Tags", self.tags_table_name.as_str()),
            ("Users", self.users_table_name.as_str()),
            ("Relations", self.relations_table_name.as_str()),
        ]
    }

    /// Build a DynamoDB client for the configured region and endpoint
    pub async fn dynamodb_client(&self) -> DynamoDbClient {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));

        if let Some(endpoint_url) = &self.dynamodb_endpoint_url {
            info!("Using DynamoDB endpoint override: {}", endpoint_url);
            loader = loader.endpoint_url(endpoint_url);
        }

        let aws_config = loader.load().await;
        DynamoDbClient::new(&aws_config)
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("api")
    }
}

impl ObservabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("observability")
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_recipes_table() -> String {
    "FoodgramRecipes".to_string()
}

pub(crate) fn default_ingredients_table() -> String {
    "FoodgramIngredients".to_string()
}

pub(crate) fn default_tags_table() -> String {
    "FoodgramTags".to_string()
}

pub(crate) fn default_users_table() -> String {
    "FoodgramUsers".to_string()
}

pub(crate) fn default_relations_table() -> String {
    "FoodgramRelations".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_media_base_url() -> String {
    "http://localhost:8080/media".to_string()
}

pub(crate) fn default_page_size() -> usize {
    6
}

pub(crate) fn default_max_page_size() -> usize {
    100
}

pub(crate) fn default_service_name() -> String {
    "foodgram-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_otlp_endpoint_option() -> Option<String> {
    std::env::var("FOODGRAM_OTLP_ENDPOINT").ok()
}

pub(crate) fn default_enable_json_logging() -> bool {
    std::env::var("FOODGRAM_ENABLE_JSON_LOGGING")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
