use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::database::{begin_with_lock_timeout, is_lock_timeout, unique_violation_constraint};
use crate::core::error::{AppError, DomainError, Result};
use crate::features::categories::dtos::{
    BreadcrumbDto, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::models::{Category, CreateCategory, Locale};
use crate::features::categories::tree::CategoryTree;

const CATEGORY_COLUMNS: &str = "id, parent_id, name_uz, name_ru, description_uz, description_ru, \
     slug, icon, color, sort_order, is_active, services_count, created_at, updated_at";

/// Advisory lock key serializing structural edits of the category tree
const TREE_LOCK_KEY: i64 = 0x6361_7465_676f_7279;

/// Convert database error to more specific AppError with user-friendly messages
fn handle_db_error(e: sqlx::Error, slug: Option<&str>) -> AppError {
    if is_lock_timeout(&e) {
        return DomainError::CategoryTreeLocked.into();
    }

    if let Some(constraint) = unique_violation_constraint(&e) {
        if constraint.contains("slug") {
            return DomainError::DuplicateSlug(slug.unwrap_or_default().to_string()).into();
        }
        return AppError::Conflict("Category already exists".to_string());
    }

    if let sqlx::Error::Database(db_err) = &e {
        // foreign key violation: orders or executor services still point here
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23503")) {
            return AppError::Conflict(
                "Category is still referenced by orders or executor services".to_string(),
            );
        }
    }

    tracing::error!("Category query failed: {:?}", e);
    AppError::Database(e)
}

/// Service for category operations
pub struct CategoryService {
    pool: PgPool,
    lock_timeout: Duration,
}

impl CategoryService {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Transaction for a structural edit; waiting on another editor's tree
    /// lock is capped at the configured lock timeout
    async fn begin_edit(&self) -> Result<Transaction<'static, Postgres>> {
        begin_with_lock_timeout(&self.pool, self.lock_timeout)
            .await
            .map_err(|e| handle_db_error(e, None))
    }

    async fn fetch_active(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = TRUE ORDER BY sort_order, name_uz"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Snapshot of every category, active or not
    pub async fn snapshot(&self) -> Result<CategoryTree> {
        let categories =
            sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| handle_db_error(e, None))?;

        Ok(CategoryTree::new(categories))
    }

    /// Lock the tree for structural edits and load it within `tx`.
    /// A lock wait past the timeout surfaces as [`DomainError::CategoryTreeLocked`].
    async fn locked_snapshot(&self, tx: &mut Transaction<'_, Postgres>) -> Result<CategoryTree> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(TREE_LOCK_KEY)
            .execute(&mut **tx)
            .await
            .map_err(|e| handle_db_error(e, None))?;

        let categories =
            sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories"))
                .fetch_all(&mut **tx)
                .await
                .map_err(|e| handle_db_error(e, None))?;

        Ok(CategoryTree::new(categories))
    }

    /// List all active categories (flat list)
    pub async fn list(&self, locale: Locale) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.fetch_active().await?;
        Ok(categories
            .into_iter()
            .map(|c| CategoryResponseDto::localized(c, locale))
            .collect())
    }

    /// List all active categories as tree structure
    pub async fn list_tree(&self, locale: Locale) -> Result<Vec<CategoryTreeDto>> {
        let categories = self.fetch_active().await?;
        Ok(CategoryTree::new(categories).build_tree(locale))
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str, locale: Locale) -> Result<CategoryResponseDto> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1 AND is_active = TRUE"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, None))?;

        category
            .map(|c| CategoryResponseDto::localized(c, locale))
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))
    }

    /// Root-to-category path for the category with `slug`
    pub async fn breadcrumbs(&self, slug: &str, locale: Locale) -> Result<Vec<BreadcrumbDto>> {
        let tree = self.snapshot().await?;
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| handle_db_error(e, None))?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

        Ok(tree.breadcrumbs(id, locale)?)
    }

    /// Active category an order may be filed under
    pub async fn get_active(&self, id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, None))?
        .ok_or_else(|| DomainError::CategoryNotFound(id).into())
    }

    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let slug = CategoryTree::resolve_slug(dto.slug.as_deref(), &dto.name_uz)?;

        let mut tx = self.begin_edit().await?;
        let tree = self.locked_snapshot(&mut tx).await?;
        tree.check_create(dto.parent_id, &slug)?;

        let data = CreateCategory {
            parent_id: dto.parent_id,
            name_uz: dto.name_uz,
            name_ru: dto.name_ru,
            description_uz: dto.description_uz,
            description_ru: dto.description_ru,
            slug,
            icon: dto.icon,
            color: dto.color,
            sort_order: dto.sort_order,
            is_active: dto.is_active,
        };

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (
                parent_id, name_uz, name_ru, description_uz, description_ru,
                slug, icon, color, sort_order, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(data.parent_id)
        .bind(&data.name_uz)
        .bind(&data.name_ru)
        .bind(&data.description_uz)
        .bind(&data.description_ru)
        .bind(&data.slug)
        .bind(&data.icon)
        .bind(&data.color)
        .bind(data.sort_order)
        .bind(data.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, Some(&data.slug)))?;

        tx.commit().await?;

        tracing::info!(
            "Created category {} ({}) under {:?}",
            category.id,
            category.slug,
            category.parent_id
        );

        Ok(CategoryResponseDto::localized(category, Locale::default()))
    }

    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let mut tx = self.begin_edit().await?;
        let tree = self.locked_snapshot(&mut tx).await?;

        let current = tree
            .get(id)
            .cloned()
            .ok_or(DomainError::CategoryNotFound(id))?;

        if let Some(slug) = dto.slug.as_deref() {
            tree.check_slug_change(id, slug)?;
        }

        let slug = dto.slug.unwrap_or(current.slug);
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name_uz = $2, name_ru = $3, description_uz = $4, description_ru = $5,
                slug = $6, icon = $7, color = $8, sort_order = $9, is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.name_uz.unwrap_or(current.name_uz))
        .bind(dto.name_ru.unwrap_or(current.name_ru))
        .bind(dto.description_uz.or(current.description_uz))
        .bind(dto.description_ru.or(current.description_ru))
        .bind(&slug)
        .bind(dto.icon.or(current.icon))
        .bind(dto.color.or(current.color))
        .bind(dto.sort_order.unwrap_or(current.sort_order))
        .bind(dto.is_active.unwrap_or(current.is_active))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, Some(&slug)))?;

        tx.commit().await?;

        tracing::info!("Updated category {}", id);
        Ok(CategoryResponseDto::localized(category, Locale::default()))
    }

    pub async fn reparent(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<CategoryResponseDto> {
        let mut tx = self.begin_edit().await?;
        let tree = self.locked_snapshot(&mut tx).await?;
        tree.check_reparent(id, new_parent_id)?;

        let category = sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET parent_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(new_parent_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, None))?;

        tx.commit().await?;

        tracing::info!("Moved category {} under {:?}", id, new_parent_id);
        Ok(CategoryResponseDto::localized(category, Locale::default()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.begin_edit().await?;
        let tree = self.locked_snapshot(&mut tx).await?;
        tree.check_delete(id)?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| handle_db_error(e, None))?;

        tx.commit().await?;

        tracing::info!("Deleted category {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::pg_error;

    #[test]
    fn test_tree_lock_timeout_is_retryable() {
        let err = handle_db_error(pg_error("55P03"), None);
        assert!(matches!(
            err,
            AppError::Domain(DomainError::CategoryTreeLocked)
        ));
    }

    #[test]
    fn test_referenced_category_is_a_conflict() {
        assert!(matches!(
            handle_db_error(pg_error("23503"), None),
            AppError::Conflict(_)
        ));
    }
}
