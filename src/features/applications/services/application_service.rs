use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::database::{begin_with_lock_timeout, unique_violation_constraint};
use crate::core::error::{AppError, DomainError, Result};
use crate::features::applications::dtos::{
    ApplicationListQuery, ApplicationResponseDto, SubmitApplicationDto,
};
use crate::features::applications::models::OrderApplication;
use crate::features::applications::workflow;
use crate::features::auth::model::Actor;
use crate::features::notifications::{DomainEvent, EventPublisher};
use crate::features::orders::services::{lock_order, map_lock_error, save_state};

const APPLICATION_COLUMNS: &str = "id, order_id, executor_id, proposed_price, proposed_duration_hours, \
     message, available_from, status, is_viewed, rejection_reason, created_at, updated_at";

async fn lock_applications(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> Result<Vec<OrderApplication>> {
    sqlx::query_as::<_, OrderApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM order_applications WHERE order_id = $1 ORDER BY created_at FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await
    .map_err(|e| map_lock_error(e, order_id))
}

async fn lock_application(
    conn: &mut PgConnection,
    order_id: Uuid,
    application_id: Uuid,
) -> Result<OrderApplication> {
    sqlx::query_as::<_, OrderApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM order_applications WHERE id = $1 FOR UPDATE"
    ))
    .bind(application_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_lock_error(e, order_id))?
    .ok_or_else(|| DomainError::ApplicationNotFound(application_id).into())
}

async fn save_application(conn: &mut PgConnection, application: &OrderApplication) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE order_applications
        SET status = $2, is_viewed = $3, rejection_reason = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(application.id)
    .bind(application.status)
    .bind(application.is_viewed)
    .bind(&application.rejection_reason)
    .bind(application.updated_at)
    .execute(conn)
    .await
    .map_err(|e| handle_db_error(e, application))?;

    Ok(())
}

/// Translate constraint violations into the rule they back
fn handle_db_error(e: sqlx::Error, application: &OrderApplication) -> AppError {
    if let Some(constraint) = unique_violation_constraint(&e) {
        if constraint.contains("one_accepted") {
            return DomainError::OrderAlreadyAssigned(application.order_id).into();
        }
        if constraint.contains("one_active") {
            return DomainError::DuplicateApplication {
                order_id: application.order_id,
                executor_id: application.executor_id,
            }
            .into();
        }
    }

    tracing::error!("Application query failed: {:?}", e);
    AppError::Database(e)
}

/// Service for bids on orders
pub struct ApplicationService {
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
    lock_timeout: Duration,
}

impl ApplicationService {
    pub fn new(pool: PgPool, events: Arc<dyn EventPublisher>, lock_timeout: Duration) -> Self {
        Self {
            pool,
            events,
            lock_timeout,
        }
    }

    /// Order an application belongs to, without locking anything
    async fn order_of(&self, application_id: Uuid) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT order_id FROM order_applications WHERE id = $1")
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DomainError::ApplicationNotFound(application_id).into())
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        order_id: Uuid,
        dto: SubmitApplicationDto,
    ) -> Result<ApplicationResponseDto> {
        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let mut order = lock_order(&mut tx, order_id).await?;

        let existing = sqlx::query_as::<_, OrderApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM order_applications WHERE order_id = $1 AND executor_id = $2"
        ))
        .bind(order_id)
        .bind(actor.id)
        .fetch_all(&mut *tx)
        .await?;

        let draft = workflow::submit(&mut order, &existing, actor, dto.into(), Utc::now())?;

        let application = sqlx::query_as::<_, OrderApplication>(&format!(
            r#"
            INSERT INTO order_applications (
                id, order_id, executor_id, proposed_price, proposed_duration_hours,
                message, available_from, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(draft.id)
        .bind(draft.order_id)
        .bind(draft.executor_id)
        .bind(draft.proposed_price)
        .bind(draft.proposed_duration_hours)
        .bind(&draft.message)
        .bind(draft.available_from)
        .bind(draft.status)
        .bind(draft.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, &draft))?;

        sqlx::query(
            "UPDATE orders SET applications_count = applications_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Executor {} applied to order {} ({})",
            actor.id,
            order_id,
            application.id
        );

        self.events.publish(DomainEvent::ApplicationSubmitted {
            order_id,
            application_id: application.id,
            customer_id: order.customer_id,
            executor_id: actor.id,
        });

        Ok(application.into())
    }

    /// Accept a bid. All other pending bids on the order are rejected, the
    /// executor is assigned and the order moves to in_progress, all in one
    /// transaction.
    pub async fn accept(&self, actor: &Actor, application_id: Uuid) -> Result<ApplicationResponseDto> {
        let order_id = self.order_of(application_id).await?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let mut order = lock_order(&mut tx, order_id).await?;
        let mut applications = lock_applications(&mut tx, order_id).await?;

        let acceptance = workflow::accept(
            &mut order,
            &mut applications,
            application_id,
            actor,
            Utc::now(),
        )?;

        save_state(&mut tx, &order).await?;
        for application in applications
            .iter()
            .filter(|a| a.id == application_id || acceptance.rejected.contains(&a.id))
        {
            save_application(&mut tx, application).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Accepted application {} on order {}; {} other bids rejected",
            application_id,
            order_id,
            acceptance.rejected.len()
        );

        self.events.publish_all(vec![
            DomainEvent::ApplicationAccepted {
                order_id,
                application_id,
                executor_id: acceptance.executor_id,
                rejected_application_ids: acceptance.rejected,
            },
            acceptance.change.into(),
        ]);

        applications
            .into_iter()
            .find(|a| a.id == application_id)
            .map(Into::into)
            .ok_or_else(|| DomainError::ApplicationNotFound(application_id).into())
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        application_id: Uuid,
        reason: Option<String>,
    ) -> Result<ApplicationResponseDto> {
        let order_id = self.order_of(application_id).await?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let order = lock_order(&mut tx, order_id).await?;
        let mut application = lock_application(&mut tx, order_id, application_id).await?;

        workflow::reject(&order, &mut application, actor, reason, Utc::now())?;
        save_application(&mut tx, &application).await?;
        tx.commit().await?;

        tracing::info!("Rejected application {} on order {}", application_id, order_id);
        Ok(application.into())
    }

    pub async fn withdraw(&self, actor: &Actor, application_id: Uuid) -> Result<ApplicationResponseDto> {
        let order_id = self.order_of(application_id).await?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        // same lock order as accept: order row first, then the application
        lock_order(&mut tx, order_id).await?;
        let mut application = lock_application(&mut tx, order_id, application_id).await?;

        workflow::withdraw(&mut application, actor, Utc::now())?;
        save_application(&mut tx, &application).await?;
        tx.commit().await?;

        tracing::info!("Executor {} withdrew application {}", actor.id, application_id);
        Ok(application.into())
    }

    pub async fn mark_viewed(
        &self,
        actor: &Actor,
        application_id: Uuid,
    ) -> Result<ApplicationResponseDto> {
        let order_id = self.order_of(application_id).await?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let order = lock_order(&mut tx, order_id).await?;
        let mut application = lock_application(&mut tx, order_id, application_id).await?;

        if workflow::mark_viewed(&order, &mut application, actor)? {
            save_application(&mut tx, &application).await?;
        }
        tx.commit().await?;

        Ok(application.into())
    }

    /// Applications on one order, visible to its customer
    pub async fn list_for_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        query: &ApplicationListQuery,
    ) -> Result<(Vec<ApplicationResponseDto>, i64)> {
        let customer_id =
            sqlx::query_scalar::<_, Uuid>("SELECT customer_id FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(DomainError::OrderNotFound(order_id))?;

        if customer_id != actor.id && !actor.capabilities.can_resolve_disputes {
            return Err(DomainError::Forbidden(
                "Only the customer who posted the order can see its applications".to_string(),
            )
            .into());
        }

        self.list_by("order_id", order_id, query).await
    }

    /// The executor's own applications across all orders
    pub async fn list_own(
        &self,
        executor_id: Uuid,
        query: &ApplicationListQuery,
    ) -> Result<(Vec<ApplicationResponseDto>, i64)> {
        self.list_by("executor_id", executor_id, query).await
    }

    async fn list_by(
        &self,
        owner_column: &'static str,
        owner_id: Uuid,
        query: &ApplicationListQuery,
    ) -> Result<(Vec<ApplicationResponseDto>, i64)> {
        let pagination = query.pagination();
        let filter =
            format!("{owner_column} = $1 AND ($2::application_status IS NULL OR status = $2)");

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM order_applications WHERE {filter}"
        ))
        .bind(owner_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let applications = sqlx::query_as::<_, OrderApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM order_applications WHERE {filter} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(owner_id)
        .bind(query.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((applications.into_iter().map(Into::into).collect(), total))
    }
}
