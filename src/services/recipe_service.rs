use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use super::{require_user, unique_ids};
use crate::models::{
    CreateRecipeRequest, IngredientAmountInput, Page, Recipe, RecipeFilters, RecipeResponse,
    RelationKind, RepositoryError, ServiceError, ServiceResult, Tag, UpdateRecipeRequest, User,
    Validate,
};
use crate::repositories::{
    IngredientRepository, RecipeRepository, RelationRepository, TagRepository, UserRepository,
};

/// Recipe CRUD and the full recipe representation
pub struct RecipeService {
    recipe_repository: Arc<dyn RecipeRepository>,
    ingredient_repository: Arc<dyn IngredientRepository>,
    tag_repository: Arc<dyn TagRepository>,
    user_repository: Arc<dyn UserRepository>,
    relation_repository: Arc<dyn RelationRepository>,
    media_base_url: String,
}

fn recipe_not_found(recipe_id: &str) -> impl FnOnce(RepositoryError) -> ServiceError + '_ {
    move |err| match err {
        RepositoryError::NotFound => ServiceError::RecipeNotFound {
            id: recipe_id.to_string(),
        },
        other => other.into(),
    }
}

impl RecipeService {
    pub fn new(
        recipe_repository: Arc<dyn RecipeRepository>,
        ingredient_repository: Arc<dyn IngredientRepository>,
        tag_repository: Arc<dyn TagRepository>,
        user_repository: Arc<dyn UserRepository>,
        relation_repository: Arc<dyn RelationRepository>,
        media_base_url: String,
    ) -> Self {
        Self {
            recipe_repository,
            ingredient_repository,
            tag_repository,
            user_repository,
            relation_repository,
            media_base_url,
        }
    }

    /// Create a recipe authored by `author_id`
    #[instrument(skip(self, request), fields(author_id = %author_id, name = %request.name))]
    pub async fn create(
        &self,
        author_id: &str,
        request: CreateRecipeRequest,
    ) -> ServiceResult<RecipeResponse> {
        crate::info_with_trace!("Creating recipe");

        require_user(self.user_repository.as_ref(), author_id).await?;
        request.validate()?;
        self.ensure_references(&request.ingredients, &request.tags)
            .await?;

        let recipe = self
            .recipe_repository
            .create(Recipe::new(author_id.to_string(), request))
            .await?;

        crate::info_with_trace!("Recipe created with ID: {}", recipe.id);
        self.single_response(recipe, Some(author_id)).await
    }

    /// Replace a recipe's contents. Only its author may do this.
    #[instrument(skip(self, request), fields(caller_id = %caller_id, recipe_id = %recipe_id))]
    pub async fn update(
        &self,
        caller_id: &str,
        recipe_id: &str,
        request: UpdateRecipeRequest,
    ) -> ServiceResult<RecipeResponse> {
        crate::info_with_trace!("Updating recipe");

        let mut recipe = self.load(recipe_id).await?;
        ensure_author(&recipe, caller_id)?;

        request.validate()?;
        self.ensure_references(&request.ingredients, &request.tags)
            .await?;

        recipe.apply_update(request);
        let recipe = self
            .recipe_repository
            .update(recipe)
            .await
            .map_err(recipe_not_found(recipe_id))?;

        crate::info_with_trace!("Recipe updated successfully");
        self.single_response(recipe, Some(caller_id)).await
    }

    #[instrument(skip(self), fields(recipe_id = %recipe_id))]
    pub async fn get(&self, recipe_id: &str, viewer: Option<&str>) -> ServiceResult<RecipeResponse> {
        let recipe = self.load(recipe_id).await?;
        self.single_response(recipe, viewer).await
    }

    /// Filtered recipe list, oldest first. Per-user filters need a viewer and are
    /// ignored for anonymous callers.
    #[instrument(skip(self, filters), fields(
        tags = ?filters.tags,
        author = ?filters.author_id,
        page = page,
        limit = limit,
    ))]
    pub async fn list(
        &self,
        filters: RecipeFilters,
        page: usize,
        limit: usize,
        viewer: Option<&str>,
    ) -> ServiceResult<Page<RecipeResponse>> {
        crate::info_with_trace!("Listing recipes");

        let mut recipes = match &filters.author_id {
            Some(author_id) => self.recipe_repository.find_by_author(author_id).await?,
            None => self.recipe_repository.find_all().await?,
        };

        if !filters.tags.is_empty() {
            let mut tag_ids = Vec::new();
            for slug in &filters.tags {
                if let Some(tag) = self.tag_repository.find_by_slug(slug).await? {
                    tag_ids.push(tag.id);
                }
            }
            recipes.retain(|recipe| tag_ids.iter().any(|tag_id| recipe.has_tag(tag_id)));
        }

        if let Some(viewer) = viewer {
            if filters.is_favorited {
                let favorites = self.relation_targets(viewer, RelationKind::Favorite).await?;
                recipes.retain(|recipe| favorites.contains(&recipe.id));
            }
            if filters.is_in_shopping_cart {
                let cart = self
                    .relation_targets(viewer, RelationKind::ShoppingCart)
                    .await?;
                recipes.retain(|recipe| cart.contains(&recipe.id));
            }
        }

        recipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let Page {
            count,
            next,
            previous,
            results,
        } = Page::from_items(recipes, page, limit);
        let results = self.render(results, viewer).await?;

        crate::info_with_trace!("Found {} recipes matching filters", count);
        Ok(Page {
            count,
            next,
            previous,
            results,
        })
    }

    /// Delete a recipe and every favorite/cart entry pointing at it
    #[instrument(skip(self), fields(caller_id = %caller_id, recipe_id = %recipe_id))]
    pub async fn delete(&self, caller_id: &str, recipe_id: &str) -> ServiceResult<()> {
        crate::info_with_trace!("Deleting recipe");

        let recipe = self.load(recipe_id).await?;
        ensure_author(&recipe, caller_id)?;

        self.recipe_repository
            .delete(recipe_id)
            .await
            .map_err(recipe_not_found(recipe_id))?;

        for kind in RelationKind::RECIPE_LISTS {
            let removed = self
                .relation_repository
                .delete_by_target(kind, recipe_id)
                .await?;
            if removed > 0 {
                crate::info_with_trace!("Removed {} {} entries", removed, kind);
            }
        }

        crate::info_with_trace!("Recipe deleted successfully");
        Ok(())
    }

    async fn load(&self, recipe_id: &str) -> ServiceResult<Recipe> {
        self.recipe_repository
            .find_by_id(recipe_id)
            .await?
            .ok_or_else(|| ServiceError::RecipeNotFound {
                id: recipe_id.to_string(),
            })
    }

    /// Every referenced ingredient and tag must exist
    async fn ensure_references(
        &self,
        lines: &[IngredientAmountInput],
        tags: &[String],
    ) -> ServiceResult<()> {
        let ingredient_ids = unique_ids(lines.iter().map(|line| &line.id));
        let known: HashSet<String> = self
            .ingredient_repository
            .find_by_ids(&ingredient_ids)
            .await?
            .into_iter()
            .map(|ingredient| ingredient.id)
            .collect();
        if let Some(missing) = ingredient_ids.iter().find(|id| !known.contains(*id)) {
            return Err(ServiceError::ValidationError {
                message: format!("Unknown ingredient id: {}", missing),
            });
        }

        let tag_ids = unique_ids(tags);
        let known: HashSet<String> = self
            .tag_repository
            .find_by_ids(&tag_ids)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        if let Some(missing) = tag_ids.iter().find(|id| !known.contains(*id)) {
            return Err(ServiceError::ValidationError {
                message: format!("Unknown tag id: {}", missing),
            });
        }

        Ok(())
    }

    async fn relation_targets(
        &self,
        user_id: &str,
        kind: RelationKind,
    ) -> ServiceResult<HashSet<String>> {
        Ok(self
            .relation_repository
            .list_for_user(user_id, kind)
            .await?
            .into_iter()
            .map(|relation| relation.target_id)
            .collect())
    }

    async fn single_response(
        &self,
        recipe: Recipe,
        viewer: Option<&str>,
    ) -> ServiceResult<RecipeResponse> {
        let id = recipe.id.clone();
        self.render(vec![recipe], viewer)
            .await?
            .pop()
            .ok_or(ServiceError::RecipeNotFound { id })
    }

    /// Build full representations, loading referenced data once per batch
    async fn render(
        &self,
        recipes: Vec<Recipe>,
        viewer: Option<&str>,
    ) -> ServiceResult<Vec<RecipeResponse>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let ingredient_ids = unique_ids(
            recipes
                .iter()
                .flat_map(|recipe| recipe.ingredients.iter().map(|line| &line.ingredient_id)),
        );
        let tag_ids = unique_ids(recipes.iter().flat_map(|recipe| recipe.tag_ids.iter()));
        let author_ids = unique_ids(recipes.iter().map(|recipe| &recipe.author_id));

        let ingredients = self
            .ingredient_repository
            .find_by_ids(&ingredient_ids)
            .await?;
        let tags: HashMap<String, Tag> = self
            .tag_repository
            .find_by_ids(&tag_ids)
            .await?
            .into_iter()
            .map(|tag| (tag.id.clone(), tag))
            .collect();
        let authors: HashMap<String, User> = self
            .user_repository
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        let (favorites, cart, following) = match viewer {
            Some(viewer) => (
                self.relation_targets(viewer, RelationKind::Favorite).await?,
                self.relation_targets(viewer, RelationKind::ShoppingCart)
                    .await?,
                self.relation_targets(viewer, RelationKind::Follow).await?,
            ),
            None => Default::default(),
        };

        recipes
            .into_iter()
            .map(|recipe| -> ServiceResult<RecipeResponse> {
                let author = authors.get(&recipe.author_id).ok_or_else(|| {
                    ServiceError::UserNotFound {
                        id: recipe.author_id.clone(),
                    }
                })?;

                let image = recipe.image_url(&self.media_base_url);
                let ingredients = recipe.ingredient_responses(&ingredients);
                let tags = recipe
                    .tag_ids
                    .iter()
                    .filter_map(|tag_id| tags.get(tag_id).cloned())
                    .collect();

                Ok(RecipeResponse {
                    is_favorited: favorites.contains(&recipe.id),
                    is_in_shopping_cart: cart.contains(&recipe.id),
                    author: author.to_response(following.contains(&author.id)),
                    id: recipe.id,
                    tags,
                    ingredients,
                    name: recipe.name,
                    image,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                })
            })
            .collect()
    }
}

fn ensure_author(recipe: &Recipe, caller_id: &str) -> ServiceResult<()> {
    if recipe.author_id != caller_id {
        crate::warn_with_trace!("Caller {} is not the author of recipe {}", caller_id, recipe.id);
        return Err(ServiceError::PermissionDenied {
            message: "Only the author can change this recipe".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateTagRequest, CreateUserRequest, Ingredient, IngredientImportRow, Relation,
    };
    use crate::repositories::{
        InMemoryIngredientRepository, InMemoryRecipeRepository, InMemoryRelationRepository,
        InMemoryTagRepository, InMemoryUserRepository,
    };
    use crate::services::mocks::{
        MockIngredientRepo, MockRecipeRepo, MockRelationRepo, MockTagRepo, MockUserRepo,
    };
    use chrono::{Duration, Utc};

    const MEDIA: &str = "http://media.test/media";

    struct Fixture {
        service: RecipeService,
        recipes: Arc<InMemoryRecipeRepository>,
        relations: Arc<InMemoryRelationRepository>,
        author: User,
        reader: User,
        salt: Ingredient,
        flour: Ingredient,
        dinner: Tag,
        breakfast: Tag,
    }

    fn user(username: &str) -> User {
        User::new(CreateUserRequest {
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
        })
    }

    fn tag(name: &str, slug: &str) -> Tag {
        Tag::new(CreateTagRequest {
            name: name.to_string(),
            color: "#E26C2D".to_string(),
            slug: slug.to_string(),
        })
    }

    fn ingredient(name: &str, unit: &str) -> Ingredient {
        Ingredient::new(IngredientImportRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        })
    }

    async fn fixture() -> Fixture {
        let recipes = Arc::new(InMemoryRecipeRepository::default());
        let ingredients = Arc::new(InMemoryIngredientRepository::default());
        let tags = Arc::new(InMemoryTagRepository::default());
        let users = Arc::new(InMemoryUserRepository::default());
        let relations = Arc::new(InMemoryRelationRepository::default());

        let author = users.create(user("author")).await.unwrap();
        let reader = users.create(user("reader")).await.unwrap();
        let salt = ingredients.create(ingredient("Salt", "g")).await.unwrap();
        let flour = ingredients.create(ingredient("Flour", "g")).await.unwrap();
        let dinner = tags.create(tag("Dinner", "dinner")).await.unwrap();
        let breakfast = tags.create(tag("Breakfast", "breakfast")).await.unwrap();

        let service = RecipeService::new(
            recipes.clone(),
            ingredients,
            tags,
            users,
            relations.clone(),
            MEDIA.to_string(),
        );

        Fixture {
            service,
            recipes,
            relations,
            author,
            reader,
            salt,
            flour,
            dinner,
            breakfast,
        }
    }

    fn create_request(fx: &Fixture) -> CreateRecipeRequest {
        CreateRecipeRequest {
            ingredients: vec![
                IngredientAmountInput {
                    id: fx.flour.id.clone(),
                    amount: 500,
                },
                IngredientAmountInput {
                    id: fx.salt.id.clone(),
                    amount: 5,
                },
            ],
            tags: vec![fx.dinner.id.clone(), fx.dinner.id.clone()],
            image: "recipes/images/bread.png".to_string(),
            name: "Bread".to_string(),
            text: "Knead and bake".to_string(),
            cooking_time: 90,
        }
    }

    fn update_request(fx: &Fixture) -> UpdateRecipeRequest {
        UpdateRecipeRequest {
            ingredients: vec![IngredientAmountInput {
                id: fx.salt.id.clone(),
                amount: 3,
            }],
            tags: vec![fx.breakfast.id.clone()],
            image: None,
            name: "Salted water".to_string(),
            text: "Boil".to_string(),
            cooking_time: 5,
        }
    }

    /// Store a recipe directly with a fixed creation time
    async fn seed_recipe(fx: &Fixture, author: &User, name: &str, tag: &Tag, minutes: i64) -> Recipe {
        let mut request = create_request(fx);
        request.name = name.to_string();
        request.tags = vec![tag.id.clone()];
        let mut recipe = Recipe::new(author.id.clone(), request);
        recipe.created_at = Utc::now() - Duration::days(1) + Duration::minutes(minutes);
        fx.recipes.create(recipe).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_recipe_returns_full_representation() {
        let fx = fixture().await;

        let response = fx
            .service
            .create(&fx.author.id, create_request(&fx))
            .await
            .unwrap();

        assert_eq!(response.name, "Bread");
        assert_eq!(response.tags, vec![fx.dinner.clone()]);
        assert_eq!(response.ingredients.len(), 2);
        assert_eq!(response.ingredients[0].name, "Flour");
        assert_eq!(response.ingredients[1].measurement_unit, "g");
        assert_eq!(response.ingredients[1].amount, 5);
        assert_eq!(response.author.id, fx.author.id);
        assert!(!response.author.is_subscribed);
        assert!(!response.is_favorited);
        assert!(!response.is_in_shopping_cart);
        assert_eq!(response.image, "http://media.test/media/recipes/images/bread.png");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_tags_and_ingredients() {
        let fx = fixture().await;

        let mut request = create_request(&fx);
        request.tags.clear();
        let result = fx.service.create(&fx.author.id, request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));

        let mut request = create_request(&fx);
        request.ingredients.clear();
        let result = fx.service.create(&fx.author.id, request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_bounds_on_cooking_time_and_amount() {
        let fx = fixture().await;

        let mut request = create_request(&fx);
        request.cooking_time = 0;
        assert!(matches!(
            fx.service.create(&fx.author.id, request).await,
            Err(ServiceError::ValidationError { .. })
        ));

        let mut request = create_request(&fx);
        request.ingredients[0].amount = 0;
        assert!(matches!(
            fx.service.create(&fx.author.id, request).await,
            Err(ServiceError::ValidationError { .. })
        ));

        let mut request = create_request(&fx);
        request.cooking_time = 1000;
        request.ingredients[0].amount = 10000;
        assert!(fx.service.create(&fx.author.id, request).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let fx = fixture().await;

        let mut request = create_request(&fx);
        request.ingredients[1].id = "missing-ingredient".to_string();
        match fx.service.create(&fx.author.id, request).await {
            Err(ServiceError::ValidationError { message }) => {
                assert!(message.contains("missing-ingredient"));
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }

        let mut request = create_request(&fx);
        request.tags = vec!["missing-tag".to_string()];
        assert!(matches!(
            fx.service.create(&fx.author.id, request).await,
            Err(ServiceError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_repeated_ingredient() {
        let fx = fixture().await;

        let mut request = create_request(&fx);
        request.ingredients[1].id = fx.flour.id.clone();

        assert!(matches!(
            fx.service.create(&fx.author.id, request).await,
            Err(ServiceError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_requires_known_author() {
        let fx = fixture().await;

        let result = fx.service.create("ghost", create_request(&fx)).await;

        assert!(matches!(result, Err(ServiceError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_update_replaces_lines_and_keeps_image() {
        let fx = fixture().await;
        let created = fx
            .service
            .create(&fx.author.id, create_request(&fx))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(&fx.author.id, &created.id, update_request(&fx))
            .await
            .unwrap();

        assert_eq!(updated.name, "Salted water");
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].amount, 3);
        assert_eq!(updated.tags, vec![fx.breakfast.clone()]);
        assert_eq!(updated.image, created.image);
    }

    #[tokio::test]
    async fn test_update_by_other_user_is_denied() {
        let fx = fixture().await;
        let created = fx
            .service
            .create(&fx.author.id, create_request(&fx))
            .await
            .unwrap();

        let result = fx
            .service
            .update(&fx.reader.id, &created.id, update_request(&fx))
            .await;

        assert!(matches!(result, Err(ServiceError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_update_of_concurrently_deleted_recipe() {
        let recipe = Recipe::new(
            "author".to_string(),
            CreateRecipeRequest {
                ingredients: vec![IngredientAmountInput {
                    id: "salt".to_string(),
                    amount: 1,
                }],
                tags: vec!["dinner".to_string()],
                image: "a.png".to_string(),
                name: "Soup".to_string(),
                text: "Cook".to_string(),
                cooking_time: 10,
            },
        );
        let recipe_id = recipe.id.clone();

        let mut recipes = MockRecipeRepo::new();
        recipes
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(recipe.clone())));
        recipes
            .expect_update()
            .times(1)
            .returning(|_| Err(RepositoryError::NotFound));

        let mut ingredients = MockIngredientRepo::new();
        ingredients.expect_find_by_ids().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| Ingredient {
                    id: id.clone(),
                    name: id.clone(),
                    measurement_unit: "g".to_string(),
                })
                .collect())
        });

        let mut tags = MockTagRepo::new();
        tags.expect_find_by_ids().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| Tag {
                    id: id.clone(),
                    name: id.clone(),
                    color: "#FFFFFF".to_string(),
                    slug: id.clone(),
                })
                .collect())
        });

        let service = RecipeService::new(
            Arc::new(recipes),
            Arc::new(ingredients),
            Arc::new(tags),
            Arc::new(MockUserRepo::new()),
            Arc::new(MockRelationRepo::new()),
            MEDIA.to_string(),
        );

        let request = UpdateRecipeRequest {
            ingredients: vec![IngredientAmountInput {
                id: "salt".to_string(),
                amount: 2,
            }],
            tags: vec!["dinner".to_string()],
            image: None,
            name: "Soup".to_string(),
            text: "Cook longer".to_string(),
            cooking_time: 20,
        };

        let result = service.update("author", &recipe_id, request).await;
        assert!(matches!(result, Err(ServiceError::RecipeNotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_reports_viewer_flags() {
        let fx = fixture().await;
        let created = fx
            .service
            .create(&fx.author.id, create_request(&fx))
            .await
            .unwrap();
        fx.relations
            .insert(Relation::new(
                fx.reader.id.clone(),
                RelationKind::Favorite,
                created.id.clone(),
            ))
            .await
            .unwrap();
        fx.relations
            .insert(Relation::new(
                fx.reader.id.clone(),
                RelationKind::Follow,
                fx.author.id.clone(),
            ))
            .await
            .unwrap();

        let as_reader = fx.service.get(&created.id, Some(fx.reader.id.as_str())).await.unwrap();
        assert!(as_reader.is_favorited);
        assert!(!as_reader.is_in_shopping_cart);
        assert!(as_reader.author.is_subscribed);

        let anonymous = fx.service.get(&created.id, None).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author.is_subscribed);

        assert!(matches!(
            fx.service.get("missing", None).await,
            Err(ServiceError::RecipeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_orders_and_filters() {
        let fx = fixture().await;
        let first = seed_recipe(&fx, &fx.author, "First", &fx.dinner, 1).await;
        let second = seed_recipe(&fx, &fx.reader, "Second", &fx.breakfast, 2).await;
        let third = seed_recipe(&fx, &fx.author, "Third", &fx.breakfast, 3).await;

        let all = fx
            .service
            .list(RecipeFilters::default(), 1, 10, None)
            .await
            .unwrap();
        let names: Vec<&str> = all.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(all.count, 3);

        let by_tag = fx
            .service
            .list(
                RecipeFilters {
                    tags: vec!["breakfast".to_string(), "unknown".to_string()],
                    ..Default::default()
                },
                1,
                10,
                None,
            )
            .await
            .unwrap();
        let ids: Vec<&str> = by_tag.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), third.id.as_str()]);

        let by_author = fx
            .service
            .list(
                RecipeFilters {
                    author_id: Some(fx.author.id.clone()),
                    ..Default::default()
                },
                1,
                10,
                None,
            )
            .await
            .unwrap();
        let ids: Vec<&str> = by_author.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), third.id.as_str()]);
    }

    #[tokio::test]
    async fn test_list_per_user_filters() {
        let fx = fixture().await;
        let first = seed_recipe(&fx, &fx.author, "First", &fx.dinner, 1).await;
        seed_recipe(&fx, &fx.author, "Second", &fx.dinner, 2).await;
        fx.relations
            .insert(Relation::new(
                fx.reader.id.clone(),
                RelationKind::ShoppingCart,
                first.id.clone(),
            ))
            .await
            .unwrap();

        let filters = RecipeFilters {
            is_in_shopping_cart: true,
            ..Default::default()
        };

        let in_cart = fx
            .service
            .list(filters.clone(), 1, 10, Some(fx.reader.id.as_str()))
            .await
            .unwrap();
        assert_eq!(in_cart.count, 1);
        assert!(in_cart.results[0].is_in_shopping_cart);

        let anonymous = fx.service.list(filters, 1, 10, None).await.unwrap();
        assert_eq!(anonymous.count, 2);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let fx = fixture().await;
        for minute in 0..5 {
            seed_recipe(&fx, &fx.author, &format!("Recipe {}", minute), &fx.dinner, minute).await;
        }

        let page = fx
            .service
            .list(RecipeFilters::default(), 2, 2, None)
            .await
            .unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(page.previous, Some(1));
        assert_eq!(page.next, Some(3));
        let names: Vec<&str> = page.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Recipe 2", "Recipe 3"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_recipe_lists() {
        let fx = fixture().await;
        let created = fx
            .service
            .create(&fx.author.id, create_request(&fx))
            .await
            .unwrap();
        for kind in RelationKind::RECIPE_LISTS {
            fx.relations
                .insert(Relation::new(fx.reader.id.clone(), kind, created.id.clone()))
                .await
                .unwrap();
        }

        assert!(matches!(
            fx.service.delete(&fx.reader.id, &created.id).await,
            Err(ServiceError::PermissionDenied { .. })
        ));

        fx.service.delete(&fx.author.id, &created.id).await.unwrap();

        for kind in RelationKind::RECIPE_LISTS {
            assert!(fx
                .relations
                .list_for_user(&fx.reader.id, kind)
                .await
                .unwrap()
                .is_empty());
        }
        assert!(matches!(
            fx.service.delete(&fx.author.id, &created.id).await,
            Err(ServiceError::RecipeNotFound { .. })
        ));
    }
}
