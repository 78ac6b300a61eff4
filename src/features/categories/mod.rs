//! Service category taxonomy.
//!
//! Public endpoints expose the active hierarchy (flat, tree, breadcrumbs);
//! admin endpoints edit it under the rules in [`tree`]: unique slugs, no
//! cycles, no deleting a node that still has children.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod tree;

pub use services::CategoryService;
pub use tree::CategoryTree;
