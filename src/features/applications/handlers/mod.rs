mod application_handler;

pub use application_handler::*;
