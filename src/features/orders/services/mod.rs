mod order_service;

pub(crate) use order_service::{lock_order, map_lock_error, save_state, ORDER_COLUMNS};
pub use order_service::OrderService;
