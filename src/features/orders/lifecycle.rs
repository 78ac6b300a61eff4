//! Order state machine.
//!
//! ```text
//! draft --publish--> open --accept--> in_progress --mark_done--> waiting_confirmation
//! waiting_confirmation --complete--> completed
//! {draft, open, in_progress, waiting_confirmation} --cancel--> cancelled
//! {in_progress, waiting_confirmation} --raise_dispute--> disputed
//! disputed --resolve_dispute--> completed | cancelled
//! ```
//!
//! Every function checks authorization, the current state and its inputs
//! before touching the order, so an `Err` leaves the order unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::DomainError;
use crate::features::auth::model::Actor;
use crate::features::orders::models::{Order, OrderStatus};
use crate::shared::constants::{MAX_RATING, MIN_RATING};

/// A status change applied to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Result of a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(StatusChange),
    /// The assigned executor asked to be released; the order is unchanged
    /// until the customer or an administrator acts on it.
    Requested { order_id: Uuid, executor_id: Uuid },
}

/// How an administrator settles a dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    Completed,
    Cancelled,
}

const CUSTOMER_CANCELLABLE: &[OrderStatus] = &[
    OrderStatus::Draft,
    OrderStatus::Open,
    OrderStatus::InProgress,
    OrderStatus::WaitingConfirmation,
];

const DISPUTABLE: &[OrderStatus] = &[OrderStatus::InProgress, OrderStatus::WaitingConfirmation];

fn expected_list(allowed: &[OrderStatus]) -> String {
    allowed
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn require_status(
    order: &Order,
    allowed: &[OrderStatus],
    action: &'static str,
) -> Result<(), DomainError> {
    if allowed.contains(&order.status) {
        return Ok(());
    }
    Err(DomainError::IllegalTransition {
        from: order.status.to_string(),
        action,
        expected: expected_list(allowed),
    })
}

fn require_customer(order: &Order, actor: &Actor, action: &str) -> Result<(), DomainError> {
    if order.is_customer(actor.id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "Only the customer who posted the order can {action} it"
        )))
    }
}

fn require_executor(order: &Order, actor: &Actor, action: &str) -> Result<(), DomainError> {
    if order.is_assigned_executor(actor.id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "Only the executor assigned to the order can {action} it"
        )))
    }
}

fn validate_rating(rating: i16) -> Result<(), DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::InvalidRating(rating))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).unwrap_or_default().is_empty()
}

fn set_status(order: &mut Order, to: OrderStatus, now: DateTime<Utc>) -> StatusChange {
    let change = StatusChange {
        order_id: order.id,
        from: order.status,
        to,
    };
    order.status = to;
    order.updated_at = now;
    change
}

/// Fields a draft still lacks before it can go live
pub fn missing_fields(order: &Order, category_active: bool) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !category_active {
        missing.push("category");
    }
    if is_blank(Some(order.title.as_str())) {
        missing.push("title");
    }
    if is_blank(Some(order.description.as_str())) {
        missing.push("description");
    }
    if is_blank(order.address.as_deref()) {
        missing.push("address");
    }
    if order.price_type.is_none() {
        missing.push("price_type");
    }
    missing
}

/// The customer may edit an order only while it is a draft
pub fn ensure_editable(order: &Order, actor: &Actor) -> Result<(), DomainError> {
    require_customer(order, actor, "edit")?;
    require_status(order, &[OrderStatus::Draft], "edit")
}

/// `draft -> open`, making the order visible to executors
pub fn publish(
    order: &mut Order,
    actor: &Actor,
    category_active: bool,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    require_customer(order, actor, "publish")?;
    require_status(order, &[OrderStatus::Draft], "publish")?;

    let missing = missing_fields(order, category_active);
    if !missing.is_empty() {
        return Err(DomainError::IncompleteOrder { missing });
    }

    order.is_published = true;
    Ok(set_status(order, OrderStatus::Open, now))
}

/// `open -> in_progress` once a bid is accepted
pub fn assign_executor(
    order: &mut Order,
    executor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    if order.status != OrderStatus::Open || order.executor_id.is_some() {
        return Err(DomainError::OrderAlreadyAssigned(order.id));
    }

    order.executor_id = Some(executor_id);
    order.actual_start_date = Some(now);
    Ok(set_status(order, OrderStatus::InProgress, now))
}

pub fn cancel(
    order: &mut Order,
    actor: &Actor,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<CancelOutcome, DomainError> {
    if order.status.is_terminal() {
        return Err(DomainError::TerminalOrder {
            id: order.id,
            status: order.status.to_string(),
        });
    }

    if order.is_customer(actor.id) || actor.capabilities.can_resolve_disputes {
        require_status(order, CUSTOMER_CANCELLABLE, "cancel")?;
        order.cancellation_reason = reason;
        return Ok(CancelOutcome::Cancelled(set_status(
            order,
            OrderStatus::Cancelled,
            now,
        )));
    }

    if order.is_assigned_executor(actor.id) {
        require_status(order, &[OrderStatus::InProgress], "request cancellation of")?;
        return Ok(CancelOutcome::Requested {
            order_id: order.id,
            executor_id: actor.id,
        });
    }

    Err(DomainError::Forbidden(
        "Only the customer or the assigned executor can cancel this order".to_string(),
    ))
}

/// `in_progress -> waiting_confirmation`, the executor reports the job done
pub fn mark_done(
    order: &mut Order,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    require_executor(order, actor, "mark done")?;
    require_status(order, &[OrderStatus::InProgress], "mark done")?;
    Ok(set_status(order, OrderStatus::WaitingConfirmation, now))
}

/// `waiting_confirmation -> completed`, recording the customer's rating of
/// the executor
pub fn complete(
    order: &mut Order,
    actor: &Actor,
    rating: i16,
    review: Option<String>,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    require_customer(order, actor, "complete")?;
    require_status(order, &[OrderStatus::WaitingConfirmation], "complete")?;
    validate_rating(rating)?;

    order.actual_end_date = Some(now);
    order.customer_rating = Some(rating);
    order.customer_review = review;
    Ok(set_status(order, OrderStatus::Completed, now))
}

/// The executor's rating of the customer, once per completed order
pub fn rate_customer(
    order: &mut Order,
    actor: &Actor,
    rating: i16,
    review: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    require_executor(order, actor, "rate")?;
    require_status(order, &[OrderStatus::Completed], "rate")?;
    if order.executor_rating.is_some() {
        return Err(DomainError::AlreadyRated(order.id));
    }
    validate_rating(rating)?;

    order.executor_rating = Some(rating);
    order.executor_review = review;
    order.updated_at = now;
    Ok(())
}

pub fn raise_dispute(
    order: &mut Order,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    if !order.is_customer(actor.id) && !order.is_assigned_executor(actor.id) {
        return Err(DomainError::Forbidden(
            "Only the customer or the assigned executor can dispute this order".to_string(),
        ));
    }
    require_status(order, DISPUTABLE, "dispute")?;
    Ok(set_status(order, OrderStatus::Disputed, now))
}

pub fn resolve_dispute(
    order: &mut Order,
    actor: &Actor,
    outcome: DisputeOutcome,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    if !actor.capabilities.can_resolve_disputes {
        return Err(DomainError::Forbidden(
            "Only an administrator can resolve disputes".to_string(),
        ));
    }
    require_status(order, &[OrderStatus::Disputed], "resolve")?;

    let to = match outcome {
        DisputeOutcome::Completed => {
            order.actual_end_date = Some(now);
            OrderStatus::Completed
        }
        DisputeOutcome::Cancelled => {
            order.cancellation_reason = note;
            OrderStatus::Cancelled
        }
    };
    Ok(set_status(order, to, now))
}

/// Unpublished drafts are private to their customer and administrators
pub fn can_view(order: &Order, actor: &Actor) -> bool {
    order.is_published
        || order.is_customer(actor.id)
        || order.is_assigned_executor(actor.id)
        || actor.capabilities.can_resolve_disputes
}

/// Views of a published order by anyone but its own customer are counted
pub fn counts_as_view(order: &Order, viewer: Uuid) -> bool {
    order.is_published && viewer != order.customer_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::{Capabilities, UserType};
    use crate::features::orders::models::test_order;

    fn actor(id: Uuid, user_type: UserType, is_admin: bool) -> Actor {
        Actor {
            id,
            capabilities: Capabilities::resolve(user_type, is_admin, false),
        }
    }

    fn customer() -> Actor {
        actor(Uuid::new_v4(), UserType::Customer, false)
    }

    fn executor() -> Actor {
        actor(Uuid::new_v4(), UserType::Executor, false)
    }

    fn in_progress(customer: &Actor, executor: &Actor) -> Order {
        let mut order = test_order(customer.id, OrderStatus::Open);
        assign_executor(&mut order, executor.id, Utc::now()).unwrap();
        order
    }

    #[test]
    fn test_publish_requires_address_then_succeeds() {
        let customer = customer();
        let mut order = test_order(customer.id, OrderStatus::Draft);
        order.address = None;

        let err = publish(&mut order, &customer, true, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::IncompleteOrder {
                missing: vec!["address"]
            }
        );
        assert_eq!(order.status, OrderStatus::Draft);
        assert!(!order.is_published);

        order.address = Some("Yunusobod 4".to_string());
        let change = publish(&mut order, &customer, true, Utc::now()).unwrap();
        assert_eq!(change.from, OrderStatus::Draft);
        assert_eq!(change.to, OrderStatus::Open);
        assert!(order.is_published);
        assert!(order.accepts_applications());
    }

    #[test]
    fn test_publish_reports_every_missing_field() {
        let customer = customer();
        let mut order = test_order(customer.id, OrderStatus::Draft);
        order.title = "   ".to_string();
        order.price_type = None;

        let err = publish(&mut order, &customer, false, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::IncompleteOrder {
                missing: vec!["category", "title", "price_type"]
            }
        );
    }

    #[test]
    fn test_publish_only_from_draft_and_by_owner() {
        let customer = customer();
        let mut order = test_order(customer.id, OrderStatus::Open);
        assert!(matches!(
            publish(&mut order, &customer, true, Utc::now()),
            Err(DomainError::IllegalTransition { .. })
        ));

        let mut draft = test_order(customer.id, OrderStatus::Draft);
        assert!(matches!(
            publish(&mut draft, &executor(), true, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_full_happy_path() {
        let customer = customer();
        let executor = executor();
        let mut order = test_order(customer.id, OrderStatus::Draft);

        publish(&mut order, &customer, true, Utc::now()).unwrap();
        assign_executor(&mut order, executor.id, Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert!(order.actual_start_date.is_some());

        mark_done(&mut order, &executor, Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::WaitingConfirmation);

        complete(&mut order, &customer, 5, Some("Great".into()), Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.actual_end_date.is_some());
        assert!(!order.is_fully_rated());

        rate_customer(&mut order, &executor, 4, None, Utc::now()).unwrap();
        assert!(order.is_fully_rated());
    }

    #[test]
    fn test_complete_twice_is_illegal() {
        let customer = customer();
        let executor = executor();
        let mut order = in_progress(&customer, &executor);
        mark_done(&mut order, &executor, Utc::now()).unwrap();

        complete(&mut order, &customer, 5, None, Utc::now()).unwrap();
        let err = complete(&mut order, &customer, 5, None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::IllegalTransition {
                from: "completed".to_string(),
                action: "complete",
                expected: "waiting_confirmation".to_string(),
            }
        );
    }

    #[test]
    fn test_complete_rejects_bad_rating_without_mutation() {
        let customer = customer();
        let executor = executor();
        let mut order = in_progress(&customer, &executor);
        mark_done(&mut order, &executor, Utc::now()).unwrap();

        assert_eq!(
            complete(&mut order, &customer, 6, None, Utc::now()),
            Err(DomainError::InvalidRating(6))
        );
        assert_eq!(order.status, OrderStatus::WaitingConfirmation);
        assert!(order.customer_rating.is_none());
    }

    #[test]
    fn test_rate_customer_only_once() {
        let customer = customer();
        let executor = executor();
        let mut order = in_progress(&customer, &executor);
        mark_done(&mut order, &executor, Utc::now()).unwrap();
        complete(&mut order, &customer, 5, None, Utc::now()).unwrap();

        rate_customer(&mut order, &executor, 5, None, Utc::now()).unwrap();
        assert_eq!(
            rate_customer(&mut order, &executor, 3, None, Utc::now()),
            Err(DomainError::AlreadyRated(order.id))
        );
        assert_eq!(order.executor_rating, Some(5));
    }

    #[test]
    fn test_assign_executor_twice_is_conflict() {
        let customer = customer();
        let mut order = in_progress(&customer, &executor());
        assert_eq!(
            assign_executor(&mut order, Uuid::new_v4(), Utc::now()),
            Err(DomainError::OrderAlreadyAssigned(order.id))
        );
    }

    #[test]
    fn test_customer_cancels_open_order() {
        let customer = customer();
        let mut order = test_order(customer.id, OrderStatus::Open);

        let outcome = cancel(&mut order, &customer, Some("Changed plans".into()), Utc::now());
        assert!(matches!(outcome, Ok(CancelOutcome::Cancelled(_))));
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancellation_reason.as_deref(), Some("Changed plans"));

        assert!(matches!(
            cancel(&mut order, &customer, None, Utc::now()),
            Err(DomainError::TerminalOrder { .. })
        ));
    }

    #[test]
    fn test_executor_only_requests_cancellation() {
        let customer = customer();
        let executor = executor();
        let mut order = in_progress(&customer, &executor);

        let outcome = cancel(&mut order, &executor, None, Utc::now()).unwrap();
        assert_eq!(
            outcome,
            CancelOutcome::Requested {
                order_id: order.id,
                executor_id: executor.id
            }
        );
        assert_eq!(order.status, OrderStatus::InProgress);
    }

    #[test]
    fn test_stranger_cannot_cancel() {
        let mut order = test_order(Uuid::new_v4(), OrderStatus::Open);
        assert!(matches!(
            cancel(&mut order, &executor(), None, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_disputed_order_is_cancelled_only_by_resolution() {
        let customer = customer();
        let executor = executor();
        let admin = actor(Uuid::new_v4(), UserType::Customer, true);
        let mut order = in_progress(&customer, &executor);

        raise_dispute(&mut order, &executor, Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Disputed);

        assert!(matches!(
            cancel(&mut order, &customer, None, Utc::now()),
            Err(DomainError::IllegalTransition { .. })
        ));
        assert!(matches!(
            resolve_dispute(&mut order, &customer, DisputeOutcome::Cancelled, None, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));

        let change = resolve_dispute(
            &mut order,
            &admin,
            DisputeOutcome::Cancelled,
            Some("No-show".into()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(change.to, OrderStatus::Cancelled);
        assert_eq!(order.cancellation_reason.as_deref(), Some("No-show"));
    }

    #[test]
    fn test_dispute_only_from_active_work() {
        let customer = customer();
        let mut order = test_order(customer.id, OrderStatus::Open);
        assert!(matches!(
            raise_dispute(&mut order, &customer, Utc::now()),
            Err(DomainError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_edit_only_drafts() {
        let customer = customer();
        let draft = test_order(customer.id, OrderStatus::Draft);
        assert!(ensure_editable(&draft, &customer).is_ok());

        let open = test_order(customer.id, OrderStatus::Open);
        assert!(ensure_editable(&open, &customer).is_err());
    }

    #[test]
    fn test_drafts_are_private() {
        let customer = customer();
        let draft = test_order(customer.id, OrderStatus::Draft);
        assert!(can_view(&draft, &customer));
        assert!(!can_view(&draft, &executor()));

        let open = test_order(customer.id, OrderStatus::Open);
        assert!(can_view(&open, &executor()));
    }

    #[test]
    fn test_owner_views_are_not_counted() {
        let order = test_order(Uuid::new_v4(), OrderStatus::Open);
        assert!(!counts_as_view(&order, order.customer_id));
        assert!(counts_as_view(&order, Uuid::new_v4()));

        let draft = test_order(Uuid::new_v4(), OrderStatus::Draft);
        assert!(!counts_as_view(&draft, Uuid::new_v4()));
    }
}
