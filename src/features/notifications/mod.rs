//! Domain event fan-out.
//!
//! Services publish [`DomainEvent`]s through the [`EventPublisher`] port after
//! their transaction commits; the [`NotificationRelay`] worker forwards them to
//! the notification dispatcher.

pub mod events;
pub mod publisher;
pub mod relay;

pub use events::DomainEvent;
pub use publisher::{ChannelEventPublisher, EventPublisher};
pub use relay::NotificationRelay;
