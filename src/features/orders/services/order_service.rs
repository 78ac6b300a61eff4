use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::database::{begin_with_lock_timeout, is_lock_timeout};
use crate::core::error::{AppError, DomainError, Result};
use crate::features::auth::model::Actor;
use crate::features::categories::CategoryService;
use crate::features::notifications::{DomainEvent, EventPublisher};
use crate::features::orders::dtos::{
    CreateOrderDto, OrderListQuery, OrderResponseDto, ResolveDisputeDto, UpdateOrderDto,
};
use crate::features::orders::lifecycle::{self, CancelOutcome};
use crate::features::orders::models::{CreateOrder, Order, OrderStatus};
use crate::shared::geo::Coordinates;

pub(crate) const ORDER_COLUMNS: &str = "id, customer_id, category_id, executor_id, title, description, \
     price_type, budget_min, budget_max, urgency, address, latitude, longitude, status, is_published, \
     applications_count, views_count, preferred_start_date, deadline, actual_start_date, actual_end_date, \
     customer_rating, customer_review, executor_rating, executor_review, cancellation_reason, \
     attachments, created_at, updated_at";

/// Map a failure while locking `order_id`; an expired lock wait is a
/// retryable conflict.
pub(crate) fn map_lock_error(e: sqlx::Error, order_id: Uuid) -> AppError {
    if is_lock_timeout(&e) {
        tracing::warn!("Timed out waiting for lock on order {}", order_id);
        return DomainError::OrderLocked(order_id).into();
    }
    tracing::error!("Failed to lock order {}: {:?}", order_id, e);
    AppError::Database(e)
}

/// Load the order and hold its row lock until the transaction ends
pub(crate) async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_lock_error(e, order_id))?
    .ok_or_else(|| DomainError::OrderNotFound(order_id).into())
}

/// Persist the lifecycle-owned columns of `order`.
///
/// Counters are incremented in place by their own statements and are never
/// written from here.
pub(crate) async fn save_state(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE orders
        SET status = $2, is_published = $3, executor_id = $4,
            actual_start_date = $5, actual_end_date = $6,
            customer_rating = $7, customer_review = $8,
            executor_rating = $9, executor_review = $10,
            cancellation_reason = $11, updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(order.id)
    .bind(order.status)
    .bind(order.is_published)
    .bind(order.executor_id)
    .bind(order.actual_start_date)
    .bind(order.actual_end_date)
    .bind(order.customer_rating)
    .bind(&order.customer_review)
    .bind(order.executor_rating)
    .bind(&order.executor_review)
    .bind(&order.cancellation_reason)
    .bind(order.updated_at)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save order {}: {:?}", order.id, e);
        AppError::Database(e)
    })?;

    Ok(())
}

/// Reject every still-pending application on the order
async fn reject_pending_applications(
    conn: &mut PgConnection,
    order_id: Uuid,
    reason: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE order_applications
        SET status = 'rejected', rejection_reason = $2, updated_at = NOW()
        WHERE order_id = $1 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(reason)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Service for order operations
pub struct OrderService {
    pool: PgPool,
    categories: Arc<CategoryService>,
    events: Arc<dyn EventPublisher>,
    lock_timeout: Duration,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        categories: Arc<CategoryService>,
        events: Arc<dyn EventPublisher>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            categories,
            events,
            lock_timeout,
        }
    }

    async fn fetch(&self, id: Uuid) -> Result<Order> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(id).into())
    }

    /// Lock the order, apply `apply`, persist and publish the resulting events
    async fn transition<F>(&self, order_id: Uuid, apply: F) -> Result<Order>
    where
        F: FnOnce(&mut Order, DateTime<Utc>) -> std::result::Result<Vec<DomainEvent>, DomainError>,
    {
        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let mut order = lock_order(&mut tx, order_id).await?;

        let events = apply(&mut order, Utc::now())?;
        save_state(&mut tx, &order).await?;
        tx.commit().await?;

        self.events.publish_all(events);
        Ok(order)
    }

    /// Create a draft order
    pub async fn create(&self, actor: &Actor, dto: CreateOrderDto) -> Result<OrderResponseDto> {
        self.categories.get_active(dto.category_id).await?;
        let location = Coordinates::from_parts(dto.latitude, dto.longitude)?;

        let data = CreateOrder {
            customer_id: actor.id,
            category_id: dto.category_id,
            title: dto.title,
            description: dto.description,
            price_type: dto.price_type,
            budget_min: dto.budget_min,
            budget_max: dto.budget_max,
            urgency: dto.urgency,
            address: dto.address,
            location,
            preferred_start_date: dto.preferred_start_date,
            deadline: dto.deadline,
            attachments: dto.attachments,
        };

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (
                customer_id, category_id, title, description, price_type, budget_min, budget_max,
                urgency, address, latitude, longitude, preferred_start_date, deadline, attachments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(data.customer_id)
        .bind(data.category_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.price_type)
        .bind(data.budget_min)
        .bind(data.budget_max)
        .bind(data.urgency)
        .bind(&data.address)
        .bind(data.location.map(|c| c.latitude))
        .bind(data.location.map(|c| c.longitude))
        .bind(data.preferred_start_date)
        .bind(data.deadline)
        .bind(&data.attachments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create order: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!("Created draft order {} for customer {}", order.id, actor.id);
        Ok(order.into())
    }

    /// Edit a draft; only the customer who owns it may do so
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        dto: UpdateOrderDto,
    ) -> Result<OrderResponseDto> {
        if let Some(category_id) = dto.category_id {
            self.categories.get_active(category_id).await?;
        }
        let location = Coordinates::from_parts(dto.latitude, dto.longitude)?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let current = lock_order(&mut tx, id).await?;
        lifecycle::ensure_editable(&current, actor)?;
        let (budget_min, budget_max) = dto.merged_budget(&current)?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET category_id = $2, title = $3, description = $4, price_type = $5,
                budget_min = $6, budget_max = $7, urgency = $8, address = $9,
                latitude = $10, longitude = $11, preferred_start_date = $12,
                deadline = $13, attachments = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.category_id.unwrap_or(current.category_id))
        .bind(dto.title.unwrap_or(current.title))
        .bind(dto.description.unwrap_or(current.description))
        .bind(dto.price_type.or(current.price_type))
        .bind(budget_min)
        .bind(budget_max)
        .bind(dto.urgency.unwrap_or(current.urgency))
        .bind(dto.address.or(current.address))
        .bind(location.map(|c| c.latitude).or(current.latitude))
        .bind(location.map(|c| c.longitude).or(current.longitude))
        .bind(dto.preferred_start_date.or(current.preferred_start_date))
        .bind(dto.deadline.or(current.deadline))
        .bind(dto.attachments.unwrap_or(current.attachments))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Updated draft order {}", id);
        Ok(order.into())
    }

    /// Get an order; views by anyone but its customer are counted
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<OrderResponseDto> {
        let order = self.fetch(id).await?;
        if !lifecycle::can_view(&order, actor) {
            return Err(DomainError::OrderNotFound(id).into());
        }

        if !lifecycle::counts_as_view(&order, actor.id) {
            return Ok(order.into());
        }

        let viewed = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET views_count = views_count + 1 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(viewed.into())
    }

    /// Orders posted by the customer
    pub async fn list_own(
        &self,
        customer_id: Uuid,
        query: &OrderListQuery,
    ) -> Result<(Vec<OrderResponseDto>, i64)> {
        self.list_by("customer_id", customer_id, query).await
    }

    /// Orders the executor has been assigned to
    pub async fn list_assigned(
        &self,
        executor_id: Uuid,
        query: &OrderListQuery,
    ) -> Result<(Vec<OrderResponseDto>, i64)> {
        self.list_by("executor_id", executor_id, query).await
    }

    async fn list_by(
        &self,
        owner_column: &'static str,
        owner_id: Uuid,
        query: &OrderListQuery,
    ) -> Result<(Vec<OrderResponseDto>, i64)> {
        let pagination = query.pagination();
        let filter = format!("{owner_column} = $1 AND ($2::order_status IS NULL OR status = $2)");

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
                .bind(owner_id)
                .bind(query.status)
                .fetch_one(&self.pool)
                .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(owner_id)
        .bind(query.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((orders.into_iter().map(Into::into).collect(), total))
    }

    pub async fn publish(&self, actor: &Actor, id: Uuid) -> Result<OrderResponseDto> {
        // category may have been deactivated since the draft was saved
        let category_id = self.fetch(id).await?.category_id;
        let category_active = match self.categories.get_active(category_id).await {
            Ok(_) => true,
            Err(AppError::Domain(DomainError::CategoryNotFound(_))) => false,
            Err(e) => return Err(e),
        };

        let order = self
            .transition(id, |order, now| {
                let change = lifecycle::publish(order, actor, category_active, now)?;
                Ok(vec![change.into()])
            })
            .await?;

        tracing::info!("Published order {}", id);
        Ok(order.into())
    }

    /// Cancel, or for the assigned executor request cancellation.
    ///
    /// Pending applications are rejected in the same transaction.
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponseDto> {
        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        let mut order = lock_order(&mut tx, id).await?;

        let event = match lifecycle::cancel(&mut order, actor, reason.clone(), Utc::now())? {
            CancelOutcome::Cancelled(change) => {
                save_state(&mut tx, &order).await?;
                let rejected =
                    reject_pending_applications(&mut tx, id, "Order was cancelled").await?;
                tracing::info!(
                    "Cancelled order {} ({} pending applications rejected)",
                    id,
                    rejected
                );
                DomainEvent::from(change)
            }
            CancelOutcome::Requested {
                order_id,
                executor_id,
            } => {
                tracing::info!("Executor {} requested cancellation of order {}", executor_id, order_id);
                DomainEvent::CancellationRequested {
                    order_id,
                    executor_id,
                    reason,
                }
            }
        };

        tx.commit().await?;
        self.events.publish(event);

        Ok(order.into())
    }

    pub async fn mark_done(&self, actor: &Actor, id: Uuid) -> Result<OrderResponseDto> {
        let order = self
            .transition(id, |order, now| {
                let change = lifecycle::mark_done(order, actor, now)?;
                Ok(vec![change.into()])
            })
            .await?;

        tracing::info!("Order {} marked done by executor {}", id, actor.id);
        Ok(order.into())
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        id: Uuid,
        rating: i16,
        review: Option<String>,
    ) -> Result<OrderResponseDto> {
        let order = self
            .transition(id, |order, now| {
                let change = lifecycle::complete(order, actor, rating, review, now)?;
                Ok(vec![
                    change.into(),
                    DomainEvent::OrderCompleted {
                        order_id: order.id,
                        customer_id: order.customer_id,
                        executor_id: order.executor_id,
                        rating: order.customer_rating,
                    },
                ])
            })
            .await?;

        tracing::info!("Order {} completed", id);
        Ok(order.into())
    }

    pub async fn rate_customer(
        &self,
        actor: &Actor,
        id: Uuid,
        rating: i16,
        review: Option<String>,
    ) -> Result<OrderResponseDto> {
        let order = self
            .transition(id, |order, now| {
                lifecycle::rate_customer(order, actor, rating, review, now)?;
                Ok(Vec::new())
            })
            .await?;

        tracing::info!("Executor {} rated customer on order {}", actor.id, id);
        Ok(order.into())
    }

    pub async fn raise_dispute(&self, actor: &Actor, id: Uuid) -> Result<OrderResponseDto> {
        let order = self
            .transition(id, |order, now| {
                let change = lifecycle::raise_dispute(order, actor, now)?;
                Ok(vec![change.into()])
            })
            .await?;

        tracing::info!("Order {} disputed by {}", id, actor.id);
        Ok(order.into())
    }

    pub async fn resolve_dispute(
        &self,
        actor: &Actor,
        id: Uuid,
        dto: ResolveDisputeDto,
    ) -> Result<OrderResponseDto> {
        let order = self
            .transition(id, |order, now| {
                let change = lifecycle::resolve_dispute(order, actor, dto.outcome, dto.note, now)?;
                let mut events: Vec<DomainEvent> = vec![change.into()];
                if change.to == OrderStatus::Completed {
                    events.push(DomainEvent::OrderCompleted {
                        order_id: order.id,
                        customer_id: order.customer_id,
                        executor_id: order.executor_id,
                        rating: order.customer_rating,
                    });
                }
                Ok(events)
            })
            .await?;

        tracing::info!("Dispute on order {} resolved as {}", id, order.status);
        Ok(order.into())
    }
}
