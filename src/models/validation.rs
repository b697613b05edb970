use std::collections::HashSet;

use super::{
    CreateRecipeRequest, CreateTagRequest, CreateUserRequest, IngredientAmountInput,
    IngredientImportRow, UpdateRecipeRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_RECIPE_NAME_LENGTH: usize = 150;
pub const MIN_COOKING_TIME: u32 = 1;
pub const MAX_COOKING_TIME: u32 = 1000;
pub const MIN_AMOUNT: u32 = 1;
pub const MAX_AMOUNT: u32 = 10000;
pub const MAX_TAG_NAME_LENGTH: usize = 150;
pub const MAX_TAG_SLUG_LENGTH: usize = 50;
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 150;
pub const MAX_MEASUREMENT_UNIT_LENGTH: usize = 32;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_PERSON_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

impl Validate for CreateRecipeRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_recipe_name(&self.name)?;
        validate_recipe_text(&self.text)?;
        validate_image(&self.image)?;
        validate_cooking_time(self.cooking_time)?;
        validate_tag_ids(&self.tags)?;
        validate_ingredient_lines(&self.ingredients)?;
        Ok(())
    }
}

impl Validate for UpdateRecipeRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_recipe_name(&self.name)?;
        validate_recipe_text(&self.text)?;
        if let Some(image) = &self.image {
            validate_image(image)?;
        }
        validate_cooking_time(self.cooking_time)?;
        validate_tag_ids(&self.tags)?;
        validate_ingredient_lines(&self.ingredients)?;
        Ok(())
    }
}

impl Validate for CreateTagRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_bounded_text("name", &self.name, MAX_TAG_NAME_LENGTH)?;
        validate_color(&self.color)?;
        validate_slug(&self.slug)?;
        Ok(())
    }
}

impl Validate for IngredientImportRow {
    fn validate(&self) -> ValidationResult<()> {
        validate_bounded_text("name", &self.name, MAX_INGREDIENT_NAME_LENGTH)?;
        validate_bounded_text(
            "measurement_unit",
            &self.measurement_unit,
            MAX_MEASUREMENT_UNIT_LENGTH,
        )?;
        Ok(())
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        validate_username(&self.username)?;
        validate_bounded_text("first_name", &self.first_name, MAX_PERSON_NAME_LENGTH)?;
        validate_bounded_text("last_name", &self.last_name, MAX_PERSON_NAME_LENGTH)?;
        Ok(())
    }
}

/// Validate recipe name
pub fn validate_recipe_name(name: &str) -> ValidationResult<()> {
    validate_bounded_text("name", name, MAX_RECIPE_NAME_LENGTH)?;

    if name
        .trim()
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate recipe description text
pub fn validate_recipe_text(text: &str) -> ValidationResult<()> {
    if text.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "text".to_string(),
        });
    }
    Ok(())
}

/// Validate image reference
pub fn validate_image(image: &str) -> ValidationResult<()> {
    if image.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "image".to_string(),
        });
    }
    Ok(())
}

/// Validate cooking time in minutes
pub fn validate_cooking_time(cooking_time: u32) -> ValidationResult<()> {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
        return Err(ValidationError::OutOfRange {
            field: "cooking_time".to_string(),
            min: MIN_COOKING_TIME.to_string(),
            max: MAX_COOKING_TIME.to_string(),
            value: cooking_time.to_string(),
        });
    }
    Ok(())
}

/// Validate ingredient amount
pub fn validate_amount(field: &str, amount: u32) -> ValidationResult<()> {
    if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&amount) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: MIN_AMOUNT.to_string(),
            max: MAX_AMOUNT.to_string(),
            value: amount.to_string(),
        });
    }
    Ok(())
}

/// Validate the tag id set of a recipe
pub fn validate_tag_ids(tags: &[String]) -> ValidationResult<()> {
    if tags.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "tags".to_string(),
        });
    }

    for (index, tag) in tags.iter().enumerate() {
        if tag.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("tags[{}]", index),
                value: tag.clone(),
                reason: "Tag id cannot be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate the ingredient lines of a recipe
pub fn validate_ingredient_lines(lines: &[IngredientAmountInput]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "ingredients".to_string(),
        });
    }

    let mut seen = HashSet::new();

    for (index, line) in lines.iter().enumerate() {
        if line.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("ingredients[{}].id", index),
                value: line.id.clone(),
                reason: "Ingredient id cannot be empty".to_string(),
            });
        }

        validate_amount(&format!("ingredients[{}].amount", index), line.amount)?;

        if !seen.insert(line.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "ingredients".to_string(),
                value: line.id.clone(),
            });
        }
    }

    Ok(())
}

/// Validate tag color in `#RRGGBB` form
pub fn validate_color(color: &str) -> ValidationResult<()> {
    let trimmed = color.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "color".to_string(),
            expected: "Hex color such as #E26C2D".to_string(),
        });
    }
    Ok(())
}

/// Validate tag slug
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    validate_bounded_text("slug", slug, MAX_TAG_SLUG_LENGTH)?;

    if !slug
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            expected: "Latin letters, digits, hyphens and underscores".to_string(),
        });
    }
    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_bounded_text("username", username, MAX_USERNAME_LENGTH)?;

    if !username
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            expected: "Letters, digits and @/./+/-/_ only".to_string(),
        });
    }

    if username.trim().eq_ignore_ascii_case("me") {
        return Err(ValidationError::InvalidValue {
            field: "username".to_string(),
            value: username.to_string(),
            reason: "Reserved username".to_string(),
        });
    }
    Ok(())
}

/// Validate email address
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = validate_bounded_text("email", email, MAX_EMAIL_LENGTH)?;

    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "user@example.com".to_string(),
        });
    }
    Ok(())
}

/// Validate user id taken from the caller identity header
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    let trimmed = user_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "user_id".to_string(),
        });
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "user_id".to_string(),
            expected: "User ID must contain only alphanumeric characters, hyphens, and underscores"
                .to_string(),
        });
    }

    if trimmed.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "user_id".to_string(),
            max_length: 100,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

fn validate_bounded_text<'a>(
    field: &str,
    value: &'a str,
    max_length: usize,
) -> ValidationResult<&'a str> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    let length = trimmed.chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: length,
        });
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, amount: u32) -> IngredientAmountInput {
        IngredientAmountInput {
            id: id.to_string(),
            amount,
        }
    }

    fn valid_recipe() -> CreateRecipeRequest {
        CreateRecipeRequest {
            ingredients: vec![line("salt", 5)],
            tags: vec!["breakfast".to_string()],
            image: "recipes/images/eggs.png".to_string(),
            name: "Scrambled eggs".to_string(),
            text: "Whisk and fry".to_string(),
            cooking_time: 10,
        }
    }

    #[test]
    fn test_validate_cooking_time_bounds() {
        assert!(validate_cooking_time(0).is_err());
        assert!(validate_cooking_time(1).is_ok());
        assert!(validate_cooking_time(1000).is_ok());
        assert!(validate_cooking_time(1001).is_err());
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(validate_amount("amount", 0).is_err());
        assert!(validate_amount("amount", 1).is_ok());
        assert!(validate_amount("amount", 10000).is_ok());
        assert!(validate_amount("amount", 10001).is_err());
    }

    #[test]
    fn test_validate_ingredient_lines() {
        assert!(validate_ingredient_lines(&[line("salt", 5), line("flour", 200)]).is_ok());

        // Empty
        assert!(matches!(
            validate_ingredient_lines(&[]),
            Err(ValidationError::RequiredField { .. })
        ));
        // Duplicate ingredient
        assert!(matches!(
            validate_ingredient_lines(&[line("salt", 5), line("salt", 3)]),
            Err(ValidationError::Duplicate { .. })
        ));
        // Zero amount
        assert!(matches!(
            validate_ingredient_lines(&[line("salt", 0)]),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_create_recipe_request_validation() {
        assert!(valid_recipe().validate().is_ok());

        let no_tags = CreateRecipeRequest {
            tags: vec![],
            ..valid_recipe()
        };
        assert!(no_tags.validate().is_err());

        let no_ingredients = CreateRecipeRequest {
            ingredients: vec![],
            ..valid_recipe()
        };
        assert!(no_ingredients.validate().is_err());

        let long_name = CreateRecipeRequest {
            name: "a".repeat(MAX_RECIPE_NAME_LENGTH + 1),
            ..valid_recipe()
        };
        assert!(long_name.validate().is_err());

        let control_chars = CreateRecipeRequest {
            name: "Eggs\x00".to_string(),
            ..valid_recipe()
        };
        assert!(control_chars.validate().is_err());
    }

    #[test]
    fn test_update_recipe_request_allows_missing_image() {
        let request = UpdateRecipeRequest {
            ingredients: vec![line("salt", 10000)],
            tags: vec!["dinner".to_string()],
            image: None,
            name: "Soup".to_string(),
            text: "Boil".to_string(),
            cooking_time: 1000,
        };
        assert!(request.validate().is_ok());

        let blank_image = UpdateRecipeRequest {
            image: Some("  ".to_string()),
            ..request
        };
        assert!(blank_image.validate().is_err());
    }

    #[test]
    fn test_validate_color_and_slug() {
        assert!(validate_color("#E26C2D").is_ok());
        assert!(validate_color("#e26c2d").is_ok());
        assert!(validate_color("E26C2D").is_err());
        assert!(validate_color("#E26C2").is_err());
        assert!(validate_color("#GGGGGG").is_err());

        assert!(validate_slug("breakfast").is_ok());
        assert!(validate_slug("late_night-snack2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug(&"s".repeat(MAX_TAG_SLUG_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_user_fields() {
        assert!(validate_username("chef.julia+1@home").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("me").is_err());

        assert!(validate_email("chef@example.com").is_ok());
        assert!(validate_email("chef@localhost").is_err());
        assert!(validate_email("chef.example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("user-123").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("user 123").is_err());
        assert!(validate_user_id(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_ingredient_import_row_validation() {
        let row = IngredientImportRow {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
        };
        assert!(row.validate().is_ok());

        let long_unit = IngredientImportRow {
            measurement_unit: "u".repeat(MAX_MEASUREMENT_UNIT_LENGTH + 1),
            ..row
        };
        assert!(long_unit.validate().is_err());
    }
}
