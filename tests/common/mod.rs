#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use foodgram_rs::config::{ApiConfig, DatabaseConfig, StorageBackend};
use foodgram_rs::create_router;
use foodgram_rs::handlers::{AdminState, ApiState, USER_ID_HEADER};
use foodgram_rs::observability::{BusinessTracingMiddleware, DatabaseTracingMiddleware, Metrics};
use foodgram_rs::repositories::Repositories;
use foodgram_rs::services::CatalogService;

pub const MEDIA_BASE_URL: &str = "http://media.test";

/// The real application router on the in-memory backend, served on a random port
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub metrics: Arc<Metrics>,
}

fn memory_database() -> DatabaseConfig {
    DatabaseConfig {
        storage_backend: StorageBackend::Memory,
        recipes_table_name: "TestRecipes".to_string(),
        ingredients_table_name: "TestIngredients".to_string(),
        tags_table_name: "TestTags".to_string(),
        users_table_name: "TestUsers".to_string(),
        relations_table_name: "TestRelations".to_string(),
        region: "us-west-2".to_string(),
        dynamodb_endpoint_url: None,
    }
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let repositories = Repositories::in_memory();

        let api = ApiConfig {
            media_base_url: MEDIA_BASE_URL.to_string(),
            default_page_size: 6,
            max_page_size: 100,
        };
        let api_state = ApiState::new(
            &repositories,
            &api,
            BusinessTracingMiddleware::new(metrics.clone()),
        );
        let admin_state = AdminState {
            catalog_service: Arc::new(CatalogService::new(
                repositories.tags.clone(),
                repositories.ingredients.clone(),
            )),
            table_manager: None,
            database: memory_database(),
            database_tracing: DatabaseTracingMiddleware::new(metrics.clone()),
        };
        let app = create_router(metrics.clone(), api_state, admin_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
            metrics,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Create a profile and return its id
    pub async fn create_user(&self, username: &str) -> String {
        let response = self
            .post("/api/users")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
            }))
            .send()
            .await
            .expect("Failed to create user");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.expect("Failed to parse user");
        body["id"].as_str().expect("user id").to_string()
    }

    /// Create a tag and return its id
    pub async fn create_tag(&self, name: &str, slug: &str) -> String {
        let response = self
            .post("/api/admin/tags")
            .json(&json!({ "name": name, "color": "#49B64E", "slug": slug }))
            .send()
            .await
            .expect("Failed to create tag");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.expect("Failed to parse tag");
        body["id"].as_str().expect("tag id").to_string()
    }

    /// Import one ingredient and return its id
    pub async fn create_ingredient(&self, name: &str, unit: &str) -> String {
        let response = self
            .post("/api/admin/ingredients/import")
            .json(&json!({ "ingredients": [{ "name": name, "measurement_unit": unit }] }))
            .send()
            .await
            .expect("Failed to import ingredient");
        assert_eq!(response.status().as_u16(), 200);

        let found: Vec<Value> = self
            .get(&format!("/api/ingredients?name={}", name))
            .send()
            .await
            .expect("Failed to search ingredients")
            .json()
            .await
            .expect("Failed to parse ingredients");
        found
            .iter()
            .find(|ingredient| ingredient["name"] == name && ingredient["measurement_unit"] == unit)
            .and_then(|ingredient| ingredient["id"].as_str())
            .expect("imported ingredient")
            .to_string()
    }

    /// Create a recipe as `author` from `(ingredient_id, amount)` lines
    pub async fn create_recipe(
        &self,
        author: &str,
        name: &str,
        tags: &[&str],
        lines: &[(&str, u32)],
    ) -> Value {
        let response = self
            .post("/api/recipes")
            .header(USER_ID_HEADER, author)
            .json(&recipe_body(name, tags, lines))
            .send()
            .await
            .expect("Failed to create recipe");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse recipe")
    }
}

pub fn recipe_body(name: &str, tags: &[&str], lines: &[(&str, u32)]) -> Value {
    json!({
        "name": name,
        "text": "Mix everything and cook.",
        "cooking_time": 20,
        "image": format!("recipes/images/{}.png", name.to_lowercase().replace(' ', "_")),
        "tags": tags,
        "ingredients": lines
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
    })
}
