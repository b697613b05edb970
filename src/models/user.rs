use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecipePreview;

/// User profile. Credentials live with the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Request model for creating a user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// User as seen by a (possibly anonymous) viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Followed author with a preview of their recipes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipePreview>,
    pub recipes_count: usize,
}

impl User {
    pub fn new(request: CreateUserRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: request.email.trim().to_lowercase(),
            username: request.username.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn to_response(&self, is_subscribed: bool) -> UserResponse {
        UserResponse {
            email: self.email.clone(),
            id: self.id.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed,
        }
    }

    pub fn to_subscription(
        &self,
        recipes: Vec<RecipePreview>,
        recipes_count: usize,
    ) -> SubscriptionResponse {
        SubscriptionResponse {
            email: self.email.clone(),
            id: self.id.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed: true,
            recipes,
            recipes_count,
        }
    }
}
