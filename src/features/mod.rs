pub mod applications;
pub mod auth;
pub mod catalog;
pub mod categories;
pub mod executors;
pub mod notifications;
pub mod orders;
