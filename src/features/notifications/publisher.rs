use tokio::sync::mpsc::{self, error::TrySendError};

use crate::features::notifications::events::{DomainEvent, EventEnvelope};

/// Outbound port for domain events.
///
/// Publishing never fails the caller: events are emitted after the
/// triggering transaction has committed and delivery is best effort.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);

    fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Hands events to the relay worker over a bounded channel
#[derive(Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::Sender<EventEnvelope>,
}

impl ChannelEventPublisher {
    /// Create the publisher and the receiving end for [`NotificationRelay`].
    ///
    /// [`NotificationRelay`]: crate::features::notifications::NotificationRelay
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelEventPublisher {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let order_id = event.order_id();

        match self.sender.try_send(EventEnvelope::new(event)) {
            Ok(()) => tracing::debug!("Queued {} event for order {}", name, order_id),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "Notification queue full, dropping {} event for order {}",
                    name,
                    order_id
                )
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(
                    "Notification relay stopped, dropping {} event for order {}",
                    name,
                    order_id
                )
            }
        }
    }
}
