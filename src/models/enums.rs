use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of per-user relations stored in the relations table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Follow,
}

impl RelationKind {
    /// Recipe lists a user can toggle recipes in and out of
    pub const RECIPE_LISTS: [RelationKind; 2] = [RelationKind::Favorite, RelationKind::ShoppingCart];

    /// Sort key for the relation row: `<kind>#<target_id>`
    pub fn sort_key(&self, target_id: &str) -> String {
        format!("{}#{}", self, target_id)
    }

    /// Prefix shared by every sort key of this kind
    pub fn sort_key_prefix(&self) -> String {
        format!("{}#", self)
    }

    pub fn duplicate_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::ShoppingCart => "Recipe is already in the shopping cart",
            RelationKind::Follow => "Already subscribed to this author",
        }
    }

    pub fn missing_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is not in favorites",
            RelationKind::ShoppingCart => "Recipe is not in the shopping cart",
            RelationKind::Follow => "Not subscribed to this author",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Favorite => write!(f, "favorite"),
            RelationKind::ShoppingCart => write!(f, "shopping_cart"),
            RelationKind::Follow => write!(f, "follow"),
        }
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "favorite" => Ok(RelationKind::Favorite),
            "shopping_cart" | "cart" => Ok(RelationKind::ShoppingCart),
            "follow" => Ok(RelationKind::Follow),
            _ => Err(format!("Invalid relation kind: {}", s)),
        }
    }
}

/// Output formats for the shopping list download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingListFormat {
    #[default]
    Pdf,
    Txt,
}

impl ShoppingListFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ShoppingListFormat::Pdf => "application/pdf",
            ShoppingListFormat::Txt => "text/plain; charset=utf-8",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ShoppingListFormat::Pdf => "shopping_list.pdf",
            ShoppingListFormat::Txt => "shopping_list.txt",
        }
    }
}

impl fmt::Display for ShoppingListFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShoppingListFormat::Pdf => write!(f, "pdf"),
            ShoppingListFormat::Txt => write!(f, "txt"),
        }
    }
}

impl FromStr for ShoppingListFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(ShoppingListFormat::Pdf),
            "txt" | "text" => Ok(ShoppingListFormat::Txt),
            _ => Err(format!("Invalid shopping list format: {}", s)),
        }
    }
}
