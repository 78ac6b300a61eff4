pub mod model;
pub mod store;

pub use model::ExecutorProfile;
pub use store::{ExecutorProfileStore, PgExecutorProfileStore};
