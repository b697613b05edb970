use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipe tag, e.g. "Breakfast"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Ingredient reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
}

/// Request model for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// One `(name, measurement_unit)` row of an ingredient import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientImportRow {
    pub name: String,
    pub measurement_unit: String,
}

/// Request model for the admin ingredient import endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportIngredientsRequest {
    pub ingredients: Vec<IngredientImportRow>,
}

/// Outcome of an ingredient import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub existing: usize,
}

/// Query parameters for the ingredient list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientSearchQuery {
    pub name: Option<String>,
}

impl Tag {
    pub fn new(request: CreateTagRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            color: request.color.trim().to_uppercase(),
            slug: request.slug.trim().to_string(),
        }
    }
}

impl Ingredient {
    pub fn new(row: IngredientImportRow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: row.name.trim().to_string(),
            measurement_unit: row.measurement_unit.trim().to_string(),
        }
    }

    /// Case-insensitive name prefix match used by the ingredient search
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.name
            .to_lowercase()
            .starts_with(&prefix.trim().to_lowercase())
    }

    /// Identity used to de-duplicate imports
    pub fn import_key(&self) -> (String, String) {
        (self.name.to_lowercase(), self.measurement_unit.to_lowercase())
    }
}

impl IngredientImportRow {
    pub fn import_key(&self) -> (String, String) {
        (
            self.name.trim().to_lowercase(),
            self.measurement_unit.trim().to_lowercase(),
        )
    }
}
