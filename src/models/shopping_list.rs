use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Ingredient, Recipe, ShoppingListFormat};

/// Aggregated line of a shopping list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: u64,
}

/// Ingredients needed for every recipe in a user's cart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

/// Rendered shopping list ready to be served as an attachment
#[derive(Debug, Clone)]
pub struct ShoppingListDocument {
    pub format: ShoppingListFormat,
    pub body: Vec<u8>,
}

impl ShoppingListItem {
    pub fn line(&self) -> String {
        format!("{} ({}) - {}", self.name, self.measurement_unit, self.amount)
    }
}

impl ShoppingList {
    pub const TITLE: &'static str = "Shopping list:";

    /// Merge `(name, unit, amount)` lines by ingredient name. Items keep the order
    /// in which a name is first seen and the unit of that first occurrence.
    pub fn aggregate<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, u32)>,
    {
        let mut totals: IndexMap<&'a str, (&'a str, u64)> = IndexMap::new();

        for (name, unit, amount) in lines {
            let entry = totals.entry(name).or_insert((unit, 0));
            entry.1 += u64::from(amount);
        }

        Self {
            items: totals
                .into_iter()
                .map(|(name, (unit, amount))| ShoppingListItem {
                    name: name.to_string(),
                    measurement_unit: unit.to_string(),
                    amount,
                })
                .collect(),
        }
    }

    /// Aggregate the ingredient lines of cart recipes, given in cart order.
    /// Lines pointing at unknown ingredients are skipped.
    pub fn from_recipes(recipes: &[Recipe], catalog: &[Ingredient]) -> Self {
        let by_id: IndexMap<&str, &Ingredient> = catalog
            .iter()
            .map(|ingredient| (ingredient.id.as_str(), ingredient))
            .collect();

        Self::aggregate(recipes.iter().flat_map(|recipe| {
            recipe.ingredients.iter().filter_map(|line| {
                by_id.get(line.ingredient_id.as_str()).map(|ingredient| {
                    (
                        ingredient.name.as_str(),
                        ingredient.measurement_unit.as_str(),
                        line.amount,
                    )
                })
            })
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.items.iter().map(ShoppingListItem::line)
    }
}
