/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Maximum length of a category slug
pub const MAX_SLUG_LENGTH: usize = 100;

/// Inclusive bounds for mutual order ratings
pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Platform administrator - manages categories and resolves disputes
pub const ROLE_ADMIN: &str = "admin";

/// Moderator - resolves disputes but cannot edit the category taxonomy
pub const ROLE_MODERATOR: &str = "moderator";
