use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Supported content locales. Uzbek is the primary locale and the source for
/// generated slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Uz,
    Ru,
}

/// Database model for category
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name_uz: String,
    pub name_ru: String,
    pub description_uz: Option<String>,
    pub description_ru: Option<String>,
    pub slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub services_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::Uz => &self.name_uz,
            Locale::Ru => &self.name_ru,
        }
    }

    /// Localized description, falling back to the other locale when the
    /// requested one was never filled in.
    pub fn description(&self, locale: Locale) -> Option<&str> {
        let (preferred, fallback) = match locale {
            Locale::Uz => (&self.description_uz, &self.description_ru),
            Locale::Ru => (&self.description_ru, &self.description_uz),
        };
        preferred.as_deref().or(fallback.as_deref())
    }
}

/// Data for inserting a category
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub parent_id: Option<Uuid>,
    pub name_uz: String,
    pub name_ru: String,
    pub description_uz: Option<String>,
    pub description_ru: Option<String>,
    pub slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

#[cfg(test)]
pub(crate) fn test_category(id: Uuid, parent_id: Option<Uuid>, name: &str) -> Category {
    Category {
        id,
        parent_id,
        name_uz: name.to_string(),
        name_ru: format!("{name} (ru)"),
        description_uz: None,
        description_ru: None,
        slug: crate::shared::validation::slugify(name).unwrap_or_else(|| id.to_string()),
        icon: None,
        color: None,
        sort_order: 0,
        is_active: true,
        services_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_falls_back_to_other_locale() {
        let mut c = test_category(Uuid::new_v4(), None, "Santexnika");
        c.description_ru = Some("Сантехника".to_string());

        assert_eq!(c.description(Locale::Uz), Some("Сантехника"));
        assert_eq!(c.name(Locale::Ru), "Santexnika (ru)");

        c.description_uz = Some("Quvurlar".to_string());
        assert_eq!(c.description(Locale::Uz), Some("Quvurlar"));
    }
}
