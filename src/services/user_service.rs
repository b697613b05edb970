use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::require_user;
use crate::models::{
    CreateUserRequest, Page, RelationKind, RepositoryError, ServiceError, ServiceResult, User,
    UserResponse, Validate,
};
use crate::repositories::{RelationRepository, UserRepository};

/// User profiles as seen by a (possibly anonymous) viewer
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    relation_repository: Arc<dyn RelationRepository>,
}

impl UserService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        relation_repository: Arc<dyn RelationRepository>,
    ) -> Self {
        Self {
            user_repository,
            relation_repository,
        }
    }

    async fn followed_by(&self, viewer: Option<&str>) -> ServiceResult<HashSet<String>> {
        let Some(viewer) = viewer else {
            return Ok(HashSet::new());
        };
        Ok(self
            .relation_repository
            .list_for_user(viewer, RelationKind::Follow)
            .await?
            .into_iter()
            .map(|relation| relation.target_id)
            .collect())
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: CreateUserRequest) -> ServiceResult<UserResponse> {
        crate::info_with_trace!("Creating user profile");

        request.validate()?;

        let username_taken = || ServiceError::AlreadyExists {
            message: format!("Username '{}' is already taken", request.username.trim()),
        };

        if self
            .user_repository
            .find_by_username(request.username.trim())
            .await?
            .is_some()
        {
            return Err(username_taken());
        }

        let user = self
            .user_repository
            .create(User::new(request.clone()))
            .await
            .map_err(|err| match err {
                RepositoryError::AlreadyExists => username_taken(),
                other => other.into(),
            })?;

        crate::info_with_trace!("Created user {}", user.id);
        Ok(user.to_response(false))
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get(&self, id: &str, viewer: Option<&str>) -> ServiceResult<UserResponse> {
        let user = self
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound { id: id.to_string() })?;

        let is_subscribed = match viewer {
            Some(viewer) if viewer != id => {
                self.relation_repository
                    .exists(viewer, RelationKind::Follow, id)
                    .await?
            }
            _ => false,
        };

        Ok(user.to_response(is_subscribed))
    }

    /// Profiles in sign-up order
    #[instrument(skip(self), fields(page = page, limit = limit))]
    pub async fn list(
        &self,
        page: usize,
        limit: usize,
        viewer: Option<&str>,
    ) -> ServiceResult<Page<UserResponse>> {
        let mut users = self.user_repository.find_all().await?;
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let followed = self.followed_by(viewer).await?;
        Ok(Page::from_items(users, page, limit)
            .map(|user| user.to_response(followed.contains(&user.id))))
    }

    /// The caller's own profile
    #[instrument(skip(self), fields(user_id = %viewer))]
    pub async fn me(&self, viewer: &str) -> ServiceResult<UserResponse> {
        let user = require_user(self.user_repository.as_ref(), viewer).await?;
        Ok(user.to_response(false))
    }
}
