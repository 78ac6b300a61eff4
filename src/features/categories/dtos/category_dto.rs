use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::{Category, Locale};
use crate::shared::validation::SLUG_REGEX;

/// Query params shared by public category endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    /// If true, return tree structure. Default: false (flat list)
    #[serde(default)]
    pub tree: bool,

    #[serde(default)]
    pub locale: Locale,
}

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Name in the requested locale
    pub name: String,
    pub description: Option<String>,
    pub name_uz: String,
    pub name_ru: String,
    pub slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub services_count: i32,
}

impl CategoryResponseDto {
    pub fn localized(c: Category, locale: Locale) -> Self {
        Self {
            name: c.name(locale).to_string(),
            description: c.description(locale).map(String::from),
            id: c.id,
            parent_id: c.parent_id,
            name_uz: c.name_uz,
            name_ru: c.name_ru,
            slug: c.slug,
            icon: c.icon,
            color: c.color,
            sort_order: c.sort_order,
            is_active: c.is_active,
            services_count: c.services_count,
        }
    }
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub services_count: i32,
    pub children: Vec<CategoryTreeDto>,
}

/// One step of a root-to-node path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreadcrumbDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

// Create request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub name_uz: String,

    #[validate(length(min = 1, max = 200))]
    pub name_ru: String,

    #[validate(length(max = 2000))]
    pub description_uz: Option<String>,

    #[validate(length(max = 2000))]
    pub description_ru: Option<String>,

    /// Generated from `name_uz` when omitted
    #[validate(length(min = 1, max = 100), regex(path = *SLUG_REGEX, message = "slug must be lowercase letters and digits separated by single hyphens"))]
    pub slug: Option<String>,

    #[validate(length(max = 100))]
    pub icon: Option<String>,

    #[validate(length(max = 20))]
    pub color: Option<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

// Update request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 200))]
    pub name_uz: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub name_ru: Option<String>,

    #[validate(length(max = 2000))]
    pub description_uz: Option<String>,

    #[validate(length(max = 2000))]
    pub description_ru: Option<String>,

    #[validate(length(min = 1, max = 100), regex(path = *SLUG_REGEX, message = "slug must be lowercase letters and digits separated by single hyphens"))]
    pub slug: Option<String>,

    #[validate(length(max = 100))]
    pub icon: Option<String>,

    #[validate(length(max = 20))]
    pub color: Option<String>,

    pub sort_order: Option<i32>,

    pub is_active: Option<bool>,
}

/// Move a category under another parent; `null` makes it a root
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReparentCategoryDto {
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dto_rejects_bad_slug() {
        let dto: CreateCategoryDto = serde_json::from_value(serde_json::json!({
            "name_uz": "Santexnika",
            "name_ru": "Сантехника",
            "slug": "Bad Slug"
        }))
        .unwrap();

        assert!(dto.validate().is_err());
        assert!(dto.is_active);
    }

    #[test]
    fn test_create_dto_slug_is_optional() {
        let dto: CreateCategoryDto = serde_json::from_value(serde_json::json!({
            "name_uz": "Santexnika",
            "name_ru": "Сантехника"
        }))
        .unwrap();

        assert!(dto.validate().is_ok());
        assert_eq!(dto.sort_order, 0);
    }
}
