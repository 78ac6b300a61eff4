use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, DomainError, Result};
use crate::features::catalog::dtos::OpenOrdersQuery;
use crate::features::catalog::visibility::{visible_orders, FeedFilter};
use crate::features::categories::CategoryService;
use crate::features::executors::ExecutorProfileStore;
use crate::features::orders::dtos::OrderResponseDto;
use crate::features::orders::models::Order;
use crate::features::orders::services::ORDER_COLUMNS;
use crate::shared::geo::EARTH_RADIUS_KM;
use crate::shared::types::PaginationQuery;

/// Orders an executor may see. `$2` is the offered category set (NULL for
/// all), `$3` whether the executor has a location, `$4..$7` the bounding box,
/// `$8..$10` the center and radius for the exact haversine check.
fn feed_filter() -> String {
    format!(
        r#"
        status = 'open' AND is_published = TRUE AND customer_id <> $1
          AND ($2::uuid[] IS NULL OR category_id = ANY($2))
          AND (
            latitude IS NULL OR longitude IS NULL
            OR ($3
                AND latitude BETWEEN $4 AND $5 AND longitude BETWEEN $6 AND $7
                AND 2 * {EARTH_RADIUS_KM} * asin(sqrt(LEAST(1.0,
                    power(sin(radians(latitude - $8) / 2), 2)
                    + cos(radians($8)) * cos(radians(latitude))
                      * power(sin(radians(longitude - $9) / 2), 2)
                ))) <= $10)
          )
        "#
    )
}

/// Read side of the marketplace: what executors can discover and bid on
pub struct CatalogService {
    pool: PgPool,
    categories: Arc<CategoryService>,
    executors: Arc<dyn ExecutorProfileStore>,
}

impl CatalogService {
    pub fn new(
        pool: PgPool,
        categories: Arc<CategoryService>,
        executors: Arc<dyn ExecutorProfileStore>,
    ) -> Self {
        Self {
            pool,
            categories,
            executors,
        }
    }

    /// Open orders visible to the executor, newest first.
    ///
    /// Category, bounding box and haversine radius are all applied in SQL so
    /// that paging and the total only ever see visible orders. The page is
    /// then run through the in-memory rules once more.
    pub async fn feed(
        &self,
        executor_id: Uuid,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<OrderResponseDto>, i64)> {
        let profile = self
            .executors
            .find(executor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Executor profile not found".to_string()))?;

        let tree = self.categories.snapshot().await?;
        let filter = FeedFilter::for_executor(&profile, &tree)?;
        let area = filter.area;
        let where_clause = feed_filter();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM orders WHERE {where_clause}"
        ))
        .bind(executor_id)
        .bind(&filter.category_ids)
        .bind(area.is_some())
        .bind(area.map_or(0.0, |a| a.bbox.min_lat))
        .bind(area.map_or(0.0, |a| a.bbox.max_lat))
        .bind(area.map_or(0.0, |a| a.bbox.min_lon))
        .bind(area.map_or(0.0, |a| a.bbox.max_lon))
        .bind(area.map_or(0.0, |a| a.center.latitude))
        .bind(area.map_or(0.0, |a| a.center.longitude))
        .bind(area.map_or(0.0, |a| a.radius_km))
        .fetch_one(&self.pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {where_clause} ORDER BY created_at DESC LIMIT $11 OFFSET $12"
        ))
        .bind(executor_id)
        .bind(&filter.category_ids)
        .bind(area.is_some())
        .bind(area.map_or(0.0, |a| a.bbox.min_lat))
        .bind(area.map_or(0.0, |a| a.bbox.max_lat))
        .bind(area.map_or(0.0, |a| a.bbox.min_lon))
        .bind(area.map_or(0.0, |a| a.bbox.max_lon))
        .bind(area.map_or(0.0, |a| a.center.latitude))
        .bind(area.map_or(0.0, |a| a.center.longitude))
        .bind(area.map_or(0.0, |a| a.radius_km))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let page = visible_orders(orders, &profile, &tree)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok((page, total))
    }

    /// Orders currently accepting applications, optionally within a category
    /// subtree
    pub async fn open_orders(
        &self,
        query: &OpenOrdersQuery,
    ) -> Result<(Vec<OrderResponseDto>, i64)> {
        let category_ids: Option<Vec<Uuid>> = match query.category_id {
            Some(id) => {
                let tree = self.categories.snapshot().await?;
                if tree.get(id).is_none() {
                    return Err(DomainError::CategoryNotFound(id).into());
                }
                Some(tree.subtree_ids(id).into_iter().collect())
            }
            None => None,
        };

        let pagination = query.pagination();
        let filter = "status = 'open' AND is_published = TRUE \
                      AND ($1::uuid[] IS NULL OR category_id = ANY($1))";

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
                .bind(&category_ids)
                .fetch_one(&self.pool)
                .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&category_ids)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((orders.into_iter().map(Into::into).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_filter_applies_every_rule_in_sql() {
        let sql = feed_filter();
        assert!(sql.contains("category_id = ANY($2)"));
        assert!(sql.contains("<= $10"));
        assert!(sql.contains("2 * 6371 * asin"));
        assert!(!sql.contains("LIMIT"));
    }
}
