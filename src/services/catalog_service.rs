use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    CreateTagRequest, ImportSummary, Ingredient, IngredientImportRow, RepositoryError,
    ServiceError, ServiceResult, Tag, Validate,
};
use crate::repositories::{IngredientRepository, TagRepository};

/// Read-mostly reference data: tags and ingredients
pub struct CatalogService {
    tag_repository: Arc<dyn TagRepository>,
    ingredient_repository: Arc<dyn IngredientRepository>,
}

fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        name(a)
            .to_lowercase()
            .cmp(&name(b).to_lowercase())
            .then_with(|| name(a).cmp(name(b)))
    });
}

impl CatalogService {
    pub fn new(
        tag_repository: Arc<dyn TagRepository>,
        ingredient_repository: Arc<dyn IngredientRepository>,
    ) -> Self {
        Self {
            tag_repository,
            ingredient_repository,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> ServiceResult<Vec<Tag>> {
        let mut tags = self.tag_repository.find_all().await?;
        sort_by_name(&mut tags, |tag| tag.name.as_str());
        Ok(tags)
    }

    #[instrument(skip(self), fields(tag_id = %id))]
    pub async fn get_tag(&self, id: &str) -> ServiceResult<Tag> {
        self.tag_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::TagNotFound { id: id.to_string() })
    }

    /// All ingredients, or those whose name starts with `name_prefix`
    /// (case-insensitive)
    #[instrument(skip(self))]
    pub async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> ServiceResult<Vec<Ingredient>> {
        let mut ingredients = match name_prefix.map(str::trim) {
            Some(prefix) if !prefix.is_empty() => {
                self.ingredient_repository.search_by_prefix(prefix).await?
            }
            _ => self.ingredient_repository.find_all().await?,
        };
        sort_by_name(&mut ingredients, |ingredient| ingredient.name.as_str());

        crate::info_with_trace!("Found {} ingredients", ingredients.len());
        Ok(ingredients)
    }

    #[instrument(skip(self), fields(ingredient_id = %id))]
    pub async fn get_ingredient(&self, id: &str) -> ServiceResult<Ingredient> {
        self.ingredient_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::IngredientNotFound { id: id.to_string() })
    }

    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create_tag(&self, request: CreateTagRequest) -> ServiceResult<Tag> {
        crate::info_with_trace!("Creating tag");

        request.validate()?;

        let slug_taken = || ServiceError::AlreadyExists {
            message: format!("Tag with slug '{}' already exists", request.slug.trim()),
        };

        if self
            .tag_repository
            .find_by_slug(request.slug.trim())
            .await?
            .is_some()
        {
            return Err(slug_taken());
        }

        let tag = self
            .tag_repository
            .create(Tag::new(request.clone()))
            .await
            .map_err(|err| match err {
                RepositoryError::AlreadyExists => slug_taken(),
                other => other.into(),
            })?;

        crate::info_with_trace!("Created tag {}", tag.id);
        Ok(tag)
    }

    /// Get-or-create each row by (name, unit). Matching ignores case and
    /// surrounding whitespace, so `Salt (g)` and `salt (G)` resolve to the same
    /// ingredient rather than two catalog entries. Rows are all validated before
    /// anything is written.
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub async fn import_ingredients(
        &self,
        rows: Vec<IngredientImportRow>,
    ) -> ServiceResult<ImportSummary> {
        for row in &rows {
            row.validate()?;
        }

        let mut known: HashSet<(String, String)> = self
            .ingredient_repository
            .find_all()
            .await?
            .iter()
            .map(Ingredient::import_key)
            .collect();

        let mut summary = ImportSummary::default();
        for row in rows {
            if !known.insert(row.import_key()) {
                summary.existing += 1;
                continue;
            }
            self.ingredient_repository
                .create(Ingredient::new(row))
                .await?;
            summary.created += 1;
        }

        crate::info_with_trace!(
            "Imported ingredients: {} created, {} existing",
            summary.created,
            summary.existing
        );
        Ok(summary)
    }
}

fn csv_error(line: u64, message: &str) -> ServiceError {
    ServiceError::ValidationError {
        message: format!("Line {}: {}", line, message),
    }
}

/// Parse `name,measurement_unit` rows. Quoting follows RFC 4180, blank lines
/// are skipped and columns after the unit are ignored.
pub fn parse_ingredient_csv(text: &str) -> ServiceResult<Vec<IngredientImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| {
            let line = err.position().map_or(0, |position| position.line());
            csv_error(line, &err.to_string())
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |position| position.line());

        let (Some(name), Some(unit)) = (record.get(0), record.get(1)) else {
            return Err(csv_error(line, "expected name,measurement_unit"));
        };
        if name.is_empty() || unit.is_empty() {
            return Err(csv_error(line, "name and measurement unit are required"));
        }

        rows.push(IngredientImportRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryIngredientRepository, InMemoryTagRepository};
    use crate::services::mocks::{MockIngredientRepo, MockTagRepo};

    fn service() -> CatalogService {
        CatalogService::new(
            Arc::new(InMemoryTagRepository::default()),
            Arc::new(InMemoryIngredientRepository::default()),
        )
    }

    fn tag_request(name: &str, slug: &str) -> CreateTagRequest {
        CreateTagRequest {
            name: name.to_string(),
            color: "#E26C2D".to_string(),
            slug: slug.to_string(),
        }
    }

    fn row(name: &str, unit: &str) -> IngredientImportRow {
        IngredientImportRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_tags_are_listed_by_name() {
        let service = service();
        service.create_tag(tag_request("Lunch", "lunch")).await.unwrap();
        service
            .create_tag(tag_request("Breakfast", "breakfast"))
            .await
            .unwrap();
        let dinner = service.create_tag(tag_request("Dinner", "dinner")).await.unwrap();

        let names: Vec<String> = service
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(names, vec!["Breakfast", "Dinner", "Lunch"]);

        assert_eq!(service.get_tag(&dinner.id).await.unwrap().slug, "dinner");
        assert!(matches!(
            service.get_tag("missing").await,
            Err(ServiceError::TagNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_tag_rejects_duplicate_slug_and_bad_color() {
        let service = service();
        service.create_tag(tag_request("Lunch", "lunch")).await.unwrap();

        assert!(matches!(
            service.create_tag(tag_request("Other", "lunch")).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let mut bad = tag_request("Brunch", "brunch");
        bad.color = "orange".to_string();
        assert!(matches!(
            service.create_tag(bad).await,
            Err(ServiceError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_ingredient_prefix_search() {
        let service = service();
        service
            .import_ingredients(vec![
                row("Salt", "g"),
                row("salmon", "g"),
                row("Sugar", "g"),
                row("Water", "ml"),
            ])
            .await
            .unwrap();

        let names: Vec<String> = service
            .list_ingredients(Some("SAL"))
            .await
            .unwrap()
            .into_iter()
            .map(|ingredient| ingredient.name)
            .collect();
        assert_eq!(names, vec!["salmon", "Salt"]);

        assert_eq!(service.list_ingredients(None).await.unwrap().len(), 4);
        assert_eq!(service.list_ingredients(Some("  ")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_import_is_get_or_create() {
        let service = service();

        let first = service
            .import_ingredients(vec![row("Salt", "g"), row("Water", "ml")])
            .await
            .unwrap();
        assert_eq!(first, ImportSummary { created: 2, existing: 0 });

        let second = service
            .import_ingredients(vec![row(" salt ", "G"), row("Milk", "ml"), row("Milk", "ml")])
            .await
            .unwrap();
        assert_eq!(second, ImportSummary { created: 1, existing: 2 });

        let salt = service.list_ingredients(Some("salt")).await.unwrap();
        assert_eq!(salt.len(), 1);
        assert_eq!(
            service.get_ingredient(&salt[0].id).await.unwrap().measurement_unit,
            "g"
        );
    }

    #[tokio::test]
    async fn test_import_validates_before_writing() {
        let mut ingredients = MockIngredientRepo::new();
        ingredients.expect_find_all().never();
        ingredients.expect_create().never();

        let service = CatalogService::new(Arc::new(MockTagRepo::new()), Arc::new(ingredients));

        let result = service
            .import_ingredients(vec![row("Salt", "g"), row("", "g")])
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[test]
    fn test_parse_ingredient_csv() {
        let rows = parse_ingredient_csv("Salt,g\n\n\"Pepper, black\",g\n  Water , ml \n").unwrap();

        assert_eq!(
            rows,
            vec![row("Salt", "g"), row("Pepper, black", "g"), row("Water", "ml")]
        );
    }

    #[test]
    fn test_parse_ingredient_csv_reports_line_number() {
        let err = parse_ingredient_csv("Salt,g\nPepper\n").unwrap_err();

        match err {
            ServiceError::ValidationError { message } => assert!(message.starts_with("Line 2")),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(parse_ingredient_csv("Salt,\n").is_err());
        assert!(parse_ingredient_csv("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_ingredient_csv_quoting_and_extra_columns() {
        let rows = parse_ingredient_csv(
            "Salt,g,extra\n\"Say \"\"hi\"\"\",pcs\n\"Chili, red\",\"g\",1,2\n",
        )
        .unwrap();

        assert_eq!(
            rows,
            vec![
                row("Salt", "g"),
                row("Say \"hi\"", "pcs"),
                row("Chili, red", "g"),
            ]
        );
    }

    #[test]
    fn test_parse_ingredient_csv_skips_byte_order_mark() {
        let rows = parse_ingredient_csv("\u{feff}Salt,g\r\nSugar,g\r\n").unwrap();

        assert_eq!(rows, vec![row("Salt", "g"), row("Sugar", "g")]);
    }
}
