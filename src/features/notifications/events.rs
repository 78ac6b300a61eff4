use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::features::orders::lifecycle::StatusChange;
use crate::features::orders::models::OrderStatus;

/// Something that happened to an order that other parties should hear about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ApplicationSubmitted {
        order_id: Uuid,
        application_id: Uuid,
        customer_id: Uuid,
        executor_id: Uuid,
    },
    ApplicationAccepted {
        order_id: Uuid,
        application_id: Uuid,
        executor_id: Uuid,
        rejected_application_ids: Vec<Uuid>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderCompleted {
        order_id: Uuid,
        customer_id: Uuid,
        executor_id: Option<Uuid>,
        rating: Option<i16>,
    },
    CancellationRequested {
        order_id: Uuid,
        executor_id: Uuid,
        reason: Option<String>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ApplicationSubmitted { .. } => "application_submitted",
            DomainEvent::ApplicationAccepted { .. } => "application_accepted",
            DomainEvent::OrderStatusChanged { .. } => "order_status_changed",
            DomainEvent::OrderCompleted { .. } => "order_completed",
            DomainEvent::CancellationRequested { .. } => "cancellation_requested",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            DomainEvent::ApplicationSubmitted { order_id, .. }
            | DomainEvent::ApplicationAccepted { order_id, .. }
            | DomainEvent::OrderStatusChanged { order_id, .. }
            | DomainEvent::OrderCompleted { order_id, .. }
            | DomainEvent::CancellationRequested { order_id, .. } => *order_id,
        }
    }
}

impl From<StatusChange> for DomainEvent {
    fn from(change: StatusChange) -> Self {
        DomainEvent::OrderStatusChanged {
            order_id: change.order_id,
            from: change.from,
            to: change.to,
        }
    }
}

/// Wire form of an event as delivered to the webhook
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_is_tagged_by_event_type() {
        let order_id = Uuid::new_v4();
        let envelope = EventEnvelope::new(DomainEvent::OrderStatusChanged {
            order_id,
            from: OrderStatus::Draft,
            to: OrderStatus::Open,
        });

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "order_status_changed");
        assert_eq!(json["from"], "draft");
        assert_eq!(json["to"], "open");
        assert_eq!(json["order_id"], order_id.to_string());
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_status_change_converts_to_event() {
        let change = StatusChange {
            order_id: Uuid::new_v4(),
            from: OrderStatus::Open,
            to: OrderStatus::InProgress,
        };
        let event = DomainEvent::from(change);
        assert_eq!(event.name(), "order_status_changed");
        assert_eq!(event.order_id(), change.order_id);
    }
}
