//! Bidding rules for a single order.
//!
//! An application starts `pending` and ends in exactly one of `accepted`,
//! `rejected` or `withdrawn`. At most one application per order is ever
//! accepted, and accepting it rejects every other pending bid in the same step.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::error::DomainError;
use crate::features::applications::models::{ApplicationStatus, OrderApplication};
use crate::features::auth::model::Actor;
use crate::features::orders::lifecycle::{self, StatusChange};
use crate::features::orders::models::{Order, OrderStatus};

/// Reason stored on bids that lose to the accepted one
pub const OUTBID_REASON: &str = "Another application was accepted";

/// Terms an executor offers
#[derive(Debug, Clone, Default)]
pub struct Bid {
    pub proposed_price: Option<Decimal>,
    pub proposed_duration_hours: Option<i32>,
    pub message: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
}

/// Everything an accept changed
#[derive(Debug, Clone, PartialEq)]
pub struct Acceptance {
    pub application_id: Uuid,
    pub executor_id: Uuid,
    pub rejected: Vec<Uuid>,
    pub change: StatusChange,
}

fn require_order_customer(order: &Order, actor: &Actor) -> Result<(), DomainError> {
    if order.is_customer(actor.id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Only the customer who posted the order can manage its applications".to_string(),
        ))
    }
}

fn require_pending(application: &OrderApplication) -> Result<(), DomainError> {
    if application.is_pending() {
        Ok(())
    } else {
        Err(DomainError::ApplicationNotPending {
            id: application.id,
            status: application.status.to_string(),
        })
    }
}

fn require_belongs(order: &Order, application: &OrderApplication) -> Result<(), DomainError> {
    if application.order_id == order.id {
        Ok(())
    } else {
        Err(DomainError::ApplicationNotFound(application.id))
    }
}

/// Place a new bid.
///
/// `existing` holds the executor's earlier applications on this order.
pub fn submit(
    order: &mut Order,
    existing: &[OrderApplication],
    executor: &Actor,
    bid: Bid,
    now: DateTime<Utc>,
) -> Result<OrderApplication, DomainError> {
    if !order.accepts_applications() {
        return Err(DomainError::OrderNotAcceptingApplications(order.id));
    }
    if order.is_customer(executor.id) {
        return Err(DomainError::Forbidden(
            "You cannot apply to your own order".to_string(),
        ));
    }

    let duplicate = existing.iter().any(|a| {
        a.order_id == order.id
            && a.executor_id == executor.id
            && a.status != ApplicationStatus::Withdrawn
    });
    if duplicate {
        return Err(DomainError::DuplicateApplication {
            order_id: order.id,
            executor_id: executor.id,
        });
    }

    order.applications_count += 1;

    Ok(OrderApplication {
        id: Uuid::now_v7(),
        order_id: order.id,
        executor_id: executor.id,
        proposed_price: bid.proposed_price,
        proposed_duration_hours: bid.proposed_duration_hours,
        message: bid.message,
        available_from: bid.available_from,
        status: ApplicationStatus::Pending,
        is_viewed: false,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    })
}

/// Accept one bid: assign its executor, start the order and reject the rest.
///
/// `applications` must hold every application on the order.
pub fn accept(
    order: &mut Order,
    applications: &mut [OrderApplication],
    application_id: Uuid,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Acceptance, DomainError> {
    require_order_customer(order, actor)?;

    let target = applications
        .iter()
        .position(|a| a.id == application_id && a.order_id == order.id)
        .ok_or(DomainError::ApplicationNotFound(application_id))?;

    if order.executor_id.is_some() {
        return Err(DomainError::OrderAlreadyAssigned(order.id));
    }
    require_pending(&applications[target])?;
    if order.status != OrderStatus::Open {
        return Err(DomainError::IllegalTransition {
            from: order.status.to_string(),
            action: "accept a bid on",
            expected: OrderStatus::Open.to_string(),
        });
    }

    let executor_id = applications[target].executor_id;
    let change = lifecycle::assign_executor(order, executor_id, now)?;

    let mut rejected = Vec::new();
    for (index, application) in applications.iter_mut().enumerate() {
        if index == target {
            application.status = ApplicationStatus::Accepted;
            application.updated_at = now;
        } else if application.is_pending() {
            application.status = ApplicationStatus::Rejected;
            application.rejection_reason = Some(OUTBID_REASON.to_string());
            application.updated_at = now;
            rejected.push(application.id);
        }
    }

    Ok(Acceptance {
        application_id,
        executor_id,
        rejected,
        change,
    })
}

pub fn reject(
    order: &Order,
    application: &mut OrderApplication,
    actor: &Actor,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    require_order_customer(order, actor)?;
    require_belongs(order, application)?;
    require_pending(application)?;

    application.status = ApplicationStatus::Rejected;
    application.rejection_reason = reason;
    application.updated_at = now;
    Ok(())
}

/// The executor takes back a pending bid; the order stays open
pub fn withdraw(
    application: &mut OrderApplication,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if application.executor_id != actor.id {
        return Err(DomainError::Forbidden(
            "Only the executor who applied can withdraw the application".to_string(),
        ));
    }
    require_pending(application)?;

    application.status = ApplicationStatus::Withdrawn;
    application.updated_at = now;
    Ok(())
}

/// Flag the bid as seen by the customer. Returns whether anything changed.
pub fn mark_viewed(
    order: &Order,
    application: &mut OrderApplication,
    actor: &Actor,
) -> Result<bool, DomainError> {
    require_order_customer(order, actor)?;
    require_belongs(order, application)?;

    if application.is_viewed {
        return Ok(false);
    }
    application.is_viewed = true;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::{Capabilities, UserType};
    use crate::features::orders::models::test_order;

    fn actor(user_type: UserType) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            capabilities: Capabilities::resolve(user_type, false, false),
        }
    }

    fn bid(price: i64) -> Bid {
        Bid {
            proposed_price: Some(Decimal::from(price)),
            ..Bid::default()
        }
    }

    struct Market {
        customer: Actor,
        order: Order,
        applications: Vec<OrderApplication>,
    }

    impl Market {
        fn open() -> Self {
            let customer = actor(UserType::Customer);
            let order = test_order(customer.id, OrderStatus::Open);
            Self {
                customer,
                order,
                applications: Vec::new(),
            }
        }

        fn apply(&mut self, executor: &Actor, price: i64) -> Result<Uuid, DomainError> {
            let application = submit(
                &mut self.order,
                &self.applications,
                executor,
                bid(price),
                Utc::now(),
            )?;
            let id = application.id;
            self.applications.push(application);
            Ok(id)
        }

        fn accepted_count(&self) -> usize {
            self.applications
                .iter()
                .filter(|a| a.status == ApplicationStatus::Accepted)
                .count()
        }
    }

    #[test]
    fn test_duplicate_bid_is_rejected() {
        let mut market = Market::open();
        let executor = actor(UserType::Executor);

        market.apply(&executor, 350_000).unwrap();
        let err = market.apply(&executor, 350_000).unwrap_err();

        assert_eq!(
            err,
            DomainError::DuplicateApplication {
                order_id: market.order.id,
                executor_id: executor.id,
            }
        );
        assert_eq!(market.order.applications_count, 1);
        assert_eq!(market.applications.len(), 1);
    }

    #[test]
    fn test_can_reapply_after_withdrawing() {
        let mut market = Market::open();
        let executor = actor(UserType::Executor);

        let first = market.apply(&executor, 300_000).unwrap();
        withdraw(&mut market.applications[0], &executor, Utc::now()).unwrap();
        assert_eq!(market.order.status, OrderStatus::Open);

        let second = market.apply(&executor, 280_000).unwrap();
        assert_ne!(first, second);
        assert_eq!(market.order.applications_count, 2);
    }

    #[test]
    fn test_submit_requires_open_published_order() {
        let customer = actor(UserType::Customer);
        let executor = actor(UserType::Executor);

        let mut draft = test_order(customer.id, OrderStatus::Draft);
        assert_eq!(
            submit(&mut draft, &[], &executor, bid(1), Utc::now()).unwrap_err(),
            DomainError::OrderNotAcceptingApplications(draft.id)
        );

        let mut unpublished = test_order(customer.id, OrderStatus::Open);
        unpublished.is_published = false;
        assert!(submit(&mut unpublished, &[], &executor, bid(1), Utc::now()).is_err());
        assert_eq!(unpublished.applications_count, 0);
    }

    #[test]
    fn test_customer_cannot_bid_on_own_order() {
        let mut market = Market::open();
        let customer = market.customer;
        assert!(matches!(
            market.apply(&customer, 100),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_accept_rejects_siblings_and_starts_order() {
        let mut market = Market::open();
        let executors: Vec<Actor> = (0..3).map(|_| actor(UserType::Executor)).collect();
        let ids: Vec<Uuid> = executors
            .iter()
            .map(|e| market.apply(e, 400_000).unwrap())
            .collect();
        withdraw(&mut market.applications[2], &executors[2], Utc::now()).unwrap();

        let customer = market.customer;
        let acceptance = accept(
            &mut market.order,
            &mut market.applications,
            ids[1],
            &customer,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(acceptance.executor_id, executors[1].id);
        assert_eq!(acceptance.rejected, vec![ids[0]]);
        assert_eq!(acceptance.change.to, OrderStatus::InProgress);
        assert_eq!(market.order.executor_id, Some(executors[1].id));
        assert_eq!(market.order.status, OrderStatus::InProgress);
        assert_eq!(market.applications[0].status, ApplicationStatus::Rejected);
        assert_eq!(market.applications[1].status, ApplicationStatus::Accepted);
        assert_eq!(market.applications[2].status, ApplicationStatus::Withdrawn);
        assert_eq!(market.accepted_count(), 1);
    }

    #[test]
    fn test_second_accept_loses_the_race() {
        let mut market = Market::open();
        let a = market.apply(&actor(UserType::Executor), 100).unwrap();
        let b = market.apply(&actor(UserType::Executor), 200).unwrap();
        let customer = market.customer;

        accept(&mut market.order, &mut market.applications, a, &customer, Utc::now()).unwrap();
        let err = accept(&mut market.order, &mut market.applications, b, &customer, Utc::now())
            .unwrap_err();

        assert_eq!(err, DomainError::OrderAlreadyAssigned(market.order.id));
        assert!(!err.is_retryable());
        assert_eq!(market.accepted_count(), 1);
    }

    #[test]
    fn test_failed_accept_changes_nothing() {
        let mut market = Market::open();
        let executor = actor(UserType::Executor);
        let id = market.apply(&executor, 100).unwrap();
        market.apply(&actor(UserType::Executor), 200).unwrap();
        withdraw(&mut market.applications[0], &executor, Utc::now()).unwrap();

        let before: Vec<ApplicationStatus> =
            market.applications.iter().map(|a| a.status).collect();
        let customer = market.customer;
        let err = accept(&mut market.order, &mut market.applications, id, &customer, Utc::now())
            .unwrap_err();

        assert!(matches!(err, DomainError::ApplicationNotPending { .. }));
        let after: Vec<ApplicationStatus> = market.applications.iter().map(|a| a.status).collect();
        assert_eq!(before, after);
        assert_eq!(market.order.status, OrderStatus::Open);
        assert!(market.order.executor_id.is_none());
    }

    #[test]
    fn test_accept_on_unassigned_closed_order() {
        let mut market = Market::open();
        let id = market.apply(&actor(UserType::Executor), 100).unwrap();
        let customer = market.customer;
        market.order.status = OrderStatus::Cancelled;

        let err = accept(&mut market.order, &mut market.applications, id, &customer, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::IllegalTransition {
                from: "cancelled".to_string(),
                action: "accept a bid on",
                expected: "open".to_string(),
            }
        );
        assert_eq!(market.accepted_count(), 0);

        market.applications[0].status = ApplicationStatus::Rejected;
        assert!(matches!(
            accept(&mut market.order, &mut market.applications, id, &customer, Utc::now()),
            Err(DomainError::ApplicationNotPending { .. })
        ));
    }

    #[test]
    fn test_accept_unknown_application() {
        let mut market = Market::open();
        let customer = market.customer;
        let missing = Uuid::new_v4();
        assert_eq!(
            accept(&mut market.order, &mut market.applications, missing, &customer, Utc::now()),
            Err(DomainError::ApplicationNotFound(missing))
        );
    }

    #[test]
    fn test_only_customer_accepts_or_rejects() {
        let mut market = Market::open();
        let executor = actor(UserType::Executor);
        let id = market.apply(&executor, 100).unwrap();

        assert!(matches!(
            accept(&mut market.order, &mut market.applications, id, &executor, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            reject(&market.order, &mut market.applications[0], &executor, None, Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_reject_records_reason_once() {
        let mut market = Market::open();
        market.apply(&actor(UserType::Executor), 100).unwrap();
        let customer = market.customer;

        reject(
            &market.order,
            &mut market.applications[0],
            &customer,
            Some("Too expensive".into()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(
            market.applications[0].rejection_reason.as_deref(),
            Some("Too expensive")
        );

        assert!(matches!(
            reject(&market.order, &mut market.applications[0], &customer, None, Utc::now()),
            Err(DomainError::ApplicationNotPending { .. })
        ));
    }

    #[test]
    fn test_withdraw_by_other_executor_is_forbidden() {
        let mut market = Market::open();
        market.apply(&actor(UserType::Executor), 100).unwrap();

        assert!(matches!(
            withdraw(&mut market.applications[0], &actor(UserType::Executor), Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
        assert!(market.applications[0].is_pending());
    }

    #[test]
    fn test_mark_viewed_is_idempotent() {
        let mut market = Market::open();
        market.apply(&actor(UserType::Executor), 100).unwrap();
        let customer = market.customer;

        assert!(mark_viewed(&market.order, &mut market.applications[0], &customer).unwrap());
        assert!(!mark_viewed(&market.order, &mut market.applications[0], &customer).unwrap());
        assert!(market.applications[0].is_viewed);
    }
}
