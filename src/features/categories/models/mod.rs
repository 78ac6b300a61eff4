mod category;

pub use category::{Category, CreateCategory, Locale};

#[cfg(test)]
pub(crate) use category::test_category;
