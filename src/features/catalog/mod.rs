//! Order discovery for executors, combining the category tree, geo radius
//! matching and the order lifecycle.

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod visibility;

pub use services::CatalogService;
