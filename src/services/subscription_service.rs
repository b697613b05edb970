use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use super::require_user;
use crate::models::{
    Page, Relation, RelationKind, RepositoryError, ServiceError, ServiceResult,
    SubscriptionResponse, User,
};
use crate::repositories::{RecipeRepository, RelationRepository, UserRepository};

/// Follow relationships between users
pub struct SubscriptionService {
    user_repository: Arc<dyn UserRepository>,
    recipe_repository: Arc<dyn RecipeRepository>,
    relation_repository: Arc<dyn RelationRepository>,
    media_base_url: String,
}

impl SubscriptionService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        recipe_repository: Arc<dyn RecipeRepository>,
        relation_repository: Arc<dyn RelationRepository>,
        media_base_url: String,
    ) -> Self {
        Self {
            user_repository,
            recipe_repository,
            relation_repository,
            media_base_url,
        }
    }

    /// Subscription view of an author: recipe previews in creation order, cut to
    /// `recipes_limit` when given
    async fn subscription_view(
        &self,
        author: &User,
        recipes_limit: Option<usize>,
    ) -> ServiceResult<SubscriptionResponse> {
        let mut recipes = self.recipe_repository.find_by_author(&author.id).await?;
        recipes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        let recipes_count = self.recipe_repository.count_by_author(&author.id).await?;

        let previews = recipes
            .iter()
            .take(recipes_limit.unwrap_or(usize::MAX))
            .map(|recipe| recipe.to_preview(&self.media_base_url))
            .collect();

        Ok(author.to_subscription(previews, recipes_count))
    }

    #[instrument(skip(self), fields(user_id = %user_id, target_id = %target_id))]
    pub async fn follow(
        &self,
        user_id: &str,
        target_id: &str,
        recipes_limit: Option<usize>,
    ) -> ServiceResult<SubscriptionResponse> {
        crate::info_with_trace!("Following user");

        require_user(self.user_repository.as_ref(), user_id).await?;

        let target = self
            .user_repository
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                id: target_id.to_string(),
            })?;

        if target.id == user_id {
            crate::warn_with_trace!("Rejected self-follow");
            return Err(ServiceError::ValidationError {
                message: "You cannot subscribe to yourself".to_string(),
            });
        }

        self.relation_repository
            .insert(Relation::new(
                user_id.to_string(),
                RelationKind::Follow,
                target_id.to_string(),
            ))
            .await
            .map_err(|err| match err {
                RepositoryError::AlreadyExists => ServiceError::RelationAlreadyExists {
                    kind: RelationKind::Follow,
                    target_id: target_id.to_string(),
                },
                other => other.into(),
            })?;

        crate::info_with_trace!("Now following {}", target.username);
        self.subscription_view(&target, recipes_limit).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, target_id = %target_id))]
    pub async fn unfollow(&self, user_id: &str, target_id: &str) -> ServiceResult<()> {
        crate::info_with_trace!("Unfollowing user");

        require_user(self.user_repository.as_ref(), user_id).await?;

        if self.user_repository.find_by_id(target_id).await?.is_none() {
            return Err(ServiceError::UserNotFound {
                id: target_id.to_string(),
            });
        }

        self.relation_repository
            .remove(user_id, RelationKind::Follow, target_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => ServiceError::RelationNotFound {
                    kind: RelationKind::Follow,
                    target_id: target_id.to_string(),
                },
                other => other.into(),
            })?;

        Ok(())
    }

    /// Followed authors in the order they were followed
    #[instrument(skip(self), fields(user_id = %user_id, page = page, limit = limit))]
    pub async fn list_subscriptions(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
        recipes_limit: Option<usize>,
    ) -> ServiceResult<Page<SubscriptionResponse>> {
        require_user(self.user_repository.as_ref(), user_id).await?;

        let followed_ids: Vec<String> = self
            .relation_repository
            .list_for_user(user_id, RelationKind::Follow)
            .await?
            .into_iter()
            .map(|relation| relation.target_id)
            .collect();

        let mut by_id: HashMap<String, User> = self
            .user_repository
            .find_by_ids(&followed_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();
        let authors: Vec<User> = followed_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        let authors = Page::from_items(authors, page, limit);
        let mut results = Vec::with_capacity(authors.results.len());
        for author in &authors.results {
            results.push(self.subscription_view(author, recipes_limit).await?);
        }

        crate::info_with_trace!(
            "Listed {} of {} subscriptions",
            results.len(),
            authors.count
        );
        Ok(Page {
            count: authors.count,
            next: authors.next,
            previous: authors.previous,
            results,
        })
    }
}
