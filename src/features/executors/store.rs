use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::executors::model::ExecutorProfile;

/// Read access to executor profiles
#[async_trait]
pub trait ExecutorProfileStore: Send + Sync {
    async fn find(&self, executor_id: Uuid) -> Result<Option<ExecutorProfile>>;
}

/// Profiles stored in the `executor_profiles` table
pub struct PgExecutorProfileStore {
    pool: PgPool,
}

impl PgExecutorProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutorProfileStore for PgExecutorProfileStore {
    async fn find(&self, executor_id: Uuid) -> Result<Option<ExecutorProfile>> {
        sqlx::query_as::<_, ExecutorProfile>(
            r#"
            SELECT executor_id, latitude, longitude, work_radius_km, is_available,
                   rating, category_ids, updated_at
            FROM executor_profiles
            WHERE executor_id = $1
            "#,
        )
        .bind(executor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load executor profile {}: {:?}", executor_id, e);
            AppError::Database(e)
        })
    }
}
