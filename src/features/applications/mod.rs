//! Executor bids on orders.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod workflow;

pub use services::ApplicationService;
