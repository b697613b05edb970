use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::{Ingredient, Tag, UserResponse};

/// Core recipe model. Ingredient lines and tag ids live inside the recipe
/// document so the whole recipe is written in one put.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub author_id: String,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: u32,
    pub ingredients: Vec<IngredientLine>,
    pub tag_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amount of one ingredient in a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient_id: String,
    pub amount: u32,
}

/// Ingredient entry of a create/update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmountInput {
    pub id: String,
    pub amount: u32,
}

/// Request model for creating a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipeRequest {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<String>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
}

/// Request model for updating a recipe. Everything but the image is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecipeRequest {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
}

/// Filters for the recipe list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilters {
    pub tags: Vec<String>,
    pub author_id: Option<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Ingredient line as rendered in a recipe response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

/// Full recipe representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: String,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: u32,
}

/// Minimal recipe representation returned by toggles and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePreview {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: u32,
}

impl Recipe {
    /// Build a new recipe from a request that already passed validation
    pub fn new(author_id: String, request: CreateRecipeRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            author_id,
            name: request.name.trim().to_string(),
            image: request.image,
            text: request.text.trim().to_string(),
            cooking_time: request.cooking_time,
            ingredients: lines_from_inputs(&request.ingredients),
            tag_ids: dedup_tag_ids(&request.tags),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the recipe contents; the image is kept unless a new one is given
    pub fn apply_update(&mut self, request: UpdateRecipeRequest) {
        if let Some(image) = request.image {
            self.image = image;
        }
        self.name = request.name.trim().to_string();
        self.text = request.text.trim().to_string();
        self.cooking_time = request.cooking_time;
        self.tag_ids = dedup_tag_ids(&request.tags);
        self.ingredients = lines_from_inputs(&request.ingredients);
        self.updated_at = Utc::now();
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }

    /// Render the image reference as a URL under the media base
    pub fn image_url(&self, media_base_url: &str) -> String {
        media_url(media_base_url, &self.image)
    }

    pub fn to_preview(&self, media_base_url: &str) -> RecipePreview {
        RecipePreview {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image_url(media_base_url),
            cooking_time: self.cooking_time,
        }
    }

    /// Expand ingredient lines with their reference data, keeping recipe order.
    /// Lines whose ingredient is no longer known are dropped.
    pub fn ingredient_responses(&self, catalog: &[Ingredient]) -> Vec<RecipeIngredientResponse> {
        self.ingredients
            .iter()
            .filter_map(|line| {
                catalog
                    .iter()
                    .find(|ingredient| ingredient.id == line.ingredient_id)
                    .map(|ingredient| RecipeIngredientResponse {
                        id: ingredient.id.clone(),
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: line.amount,
                    })
            })
            .collect()
    }
}

/// Join a stored media key onto the base URL. Absolute and data URLs pass through.
pub fn media_url(media_base_url: &str, key: &str) -> String {
    if key.starts_with("http://") || key.starts_with("https://") || key.starts_with("data:") {
        return key.to_string();
    }
    format!(
        "{}/{}",
        media_base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

fn lines_from_inputs(inputs: &[IngredientAmountInput]) -> Vec<IngredientLine> {
    inputs
        .iter()
        .map(|input| IngredientLine {
            ingredient_id: input.id.clone(),
            amount: input.amount,
        })
        .collect()
}

fn dedup_tag_ids(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateRecipeRequest {
        CreateRecipeRequest {
            ingredients: vec![
                IngredientAmountInput {
                    id: "salt".to_string(),
                    amount: 5,
                },
                IngredientAmountInput {
                    id: "flour".to_string(),
                    amount: 200,
                },
            ],
            tags: vec!["t1".to_string(), "t2".to_string(), "t1".to_string()],
            image: "recipes/images/bread.png".to_string(),
            name: "  Bread ".to_string(),
            text: "Knead and bake".to_string(),
            cooking_time: 60,
        }
    }

    #[test]
    fn test_recipe_new() {
        let recipe = Recipe::new("author-1".to_string(), create_request());

        assert!(!recipe.id.is_empty());
        assert_eq!(recipe.author_id, "author-1");
        assert_eq!(recipe.name, "Bread");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].ingredient_id, "salt");
        assert_eq!(recipe.tag_ids, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(recipe.created_at, recipe.updated_at);
    }

    #[test]
    fn test_apply_update_keeps_image_when_absent() {
        let mut recipe = Recipe::new("author-1".to_string(), create_request());
        let original_image = recipe.image.clone();

        recipe.apply_update(UpdateRecipeRequest {
            ingredients: vec![IngredientAmountInput {
                id: "sugar".to_string(),
                amount: 10,
            }],
            tags: vec!["t3".to_string()],
            image: None,
            name: "Sweet bread".to_string(),
            text: "Add sugar".to_string(),
            cooking_time: 70,
        });

        assert_eq!(recipe.image, original_image);
        assert_eq!(recipe.name, "Sweet bread");
        assert_eq!(recipe.cooking_time, 70);
        assert_eq!(recipe.tag_ids, vec!["t3".to_string()]);
        assert_eq!(recipe.ingredients.len(), 1);
        assert!(recipe.updated_at >= recipe.created_at);
    }

    #[test]
    fn test_apply_update_replaces_image_when_given() {
        let mut recipe = Recipe::new("author-1".to_string(), create_request());
        let mut update = UpdateRecipeRequest {
            ingredients: vec![],
            tags: vec![],
            image: Some("recipes/images/new.png".to_string()),
            name: "Bread".to_string(),
            text: "Bake".to_string(),
            cooking_time: 60,
        };
        update.ingredients.push(IngredientAmountInput {
            id: "salt".to_string(),
            amount: 1,
        });

        recipe.apply_update(update);
        assert_eq!(recipe.image, "recipes/images/new.png");
    }

    #[test]
    fn test_media_url() {
        assert_eq!(
            media_url("https://cdn.example.com/media/", "/recipes/a.png"),
            "https://cdn.example.com/media/recipes/a.png"
        );
        assert_eq!(
            media_url("https://cdn.example.com", "https://other.example.com/a.png"),
            "https://other.example.com/a.png"
        );
        assert_eq!(
            media_url("https://cdn.example.com", "data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_ingredient_responses_follow_recipe_order() {
        let recipe = Recipe::new("author-1".to_string(), create_request());
        let catalog = vec![
            Ingredient {
                id: "flour".to_string(),
                name: "Flour".to_string(),
                measurement_unit: "g".to_string(),
            },
            Ingredient {
                id: "salt".to_string(),
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
            },
        ];

        let lines = recipe.ingredient_responses(&catalog);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Salt");
        assert_eq!(lines[0].amount, 5);
        assert_eq!(lines[1].name, "Flour");
    }
}
