use tokio::sync::mpsc;

use crate::core::config::NotificationConfig;
use crate::core::error::{AppError, Result};
use crate::features::notifications::events::EventEnvelope;

/// Background worker draining the event channel.
///
/// Each event is POSTed as JSON to the configured webhook. Without a webhook
/// the event is only logged. Delivery failures are logged and the event is
/// dropped; the relay never retries.
pub struct NotificationRelay {
    receiver: mpsc::Receiver<EventEnvelope>,
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl NotificationRelay {
    pub fn new(receiver: mpsc::Receiver<EventEnvelope>, config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            receiver,
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }

    /// Run until every publisher has been dropped
    pub async fn run(mut self) {
        match &self.webhook_url {
            Some(url) => tracing::info!("Starting notification relay, delivering to {}", url),
            None => tracing::info!("Starting notification relay in log-only mode"),
        }

        while let Some(envelope) = self.receiver.recv().await {
            if let Err(e) = self.deliver(&envelope).await {
                tracing::warn!(
                    "Failed to deliver {} event {} for order {}: {}",
                    envelope.event.name(),
                    envelope.id,
                    envelope.event.order_id(),
                    e
                );
            }
        }

        tracing::info!("Notification relay stopped");
    }

    async fn deliver(&self, envelope: &EventEnvelope) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::info!(
                event = envelope.event.name(),
                order_id = %envelope.event.order_id(),
                "Domain event"
            );
            return Ok(());
        };

        self.client
            .post(url)
            .json(envelope)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Internal(format!("Webhook request failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::notifications::events::DomainEvent;
    use crate::features::notifications::publisher::{ChannelEventPublisher, EventPublisher};
    use crate::features::orders::models::OrderStatus;
    use axum::{extract::State, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn record(State(received): State<Received>, Json(body): Json<serde_json::Value>) {
        received.lock().unwrap().push(body);
    }

    fn config(webhook_url: Option<String>) -> NotificationConfig {
        NotificationConfig {
            webhook_url,
            request_timeout: Duration::from_secs(2),
            queue_capacity: 16,
        }
    }

    #[tokio::test]
    async fn test_relay_posts_events_to_webhook() {
        let received: Received = Arc::default();
        let app = Router::new()
            .route("/hook", post(record))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (publisher, receiver) = ChannelEventPublisher::channel(16);
        let relay =
            NotificationRelay::new(receiver, &config(Some(format!("http://{addr}/hook")))).unwrap();

        let order_id = Uuid::new_v4();
        publisher.publish(DomainEvent::OrderStatusChanged {
            order_id,
            from: OrderStatus::Draft,
            to: OrderStatus::Open,
        });
        drop(publisher);

        relay.run().await;

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["type"], "order_status_changed");
        assert_eq!(received[0]["order_id"], order_id.to_string());
    }

    #[tokio::test]
    async fn test_relay_without_webhook_drains_and_stops() {
        let (publisher, receiver) = ChannelEventPublisher::channel(16);
        let relay = NotificationRelay::new(receiver, &config(None)).unwrap();

        publisher.publish(DomainEvent::CancellationRequested {
            order_id: Uuid::new_v4(),
            executor_id: Uuid::new_v4(),
            reason: None,
        });
        drop(publisher);

        tokio::time::timeout(Duration::from_secs(1), relay.run())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_stop_the_relay() {
        let (publisher, receiver) = ChannelEventPublisher::channel(16);
        let relay = NotificationRelay::new(
            receiver,
            &config(Some("http://127.0.0.1:9/unreachable".to_string())),
        )
        .unwrap();

        for _ in 0..2 {
            publisher.publish(DomainEvent::OrderCompleted {
                order_id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                executor_id: None,
                rating: Some(5),
            });
        }
        drop(publisher);

        tokio::time::timeout(Duration::from_secs(5), relay.run())
            .await
            .unwrap();
    }
}
