pub mod dtos;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod services;

pub use services::OrderService;
