use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Coarse classification of engine failures, used for HTTP mapping and by
/// callers deciding whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict { retryable: bool },
    NotFound,
    IllegalTransition,
    Authorization,
}

/// Rule violations raised by the category tree, geo matcher, application
/// workflow and order lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    // Category tree
    #[error("Slug '{0}' is already used by another category")]
    DuplicateSlug(String),

    #[error("Invalid slug '{0}': expected lowercase letters, digits and single hyphens")]
    InvalidSlug(String),

    #[error("Parent category {0} not found")]
    ParentNotFound(Uuid),

    #[error("Category cannot be its own parent")]
    SelfParent,

    #[error("Moving category {id} under {parent_id} would create a cycle")]
    CyclicDependency { id: Uuid, parent_id: Uuid },

    #[error("Category {0} still has child categories; move or delete them first")]
    HasChildren(Uuid),

    #[error("Category {0} not found")]
    CategoryNotFound(Uuid),

    #[error("The category tree is being edited by another request; retry shortly")]
    CategoryTreeLocked,

    // Geo matching
    #[error("Invalid coordinate ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid radius {0} km: expected a non-negative number")]
    InvalidRadius(f64),

    // Applications
    #[error("Order {0} is not accepting applications; it must be open and published")]
    OrderNotAcceptingApplications(Uuid),

    #[error("Executor {executor_id} already has an active application on order {order_id}")]
    DuplicateApplication { order_id: Uuid, executor_id: Uuid },

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Application {id} is {status}; only pending applications can be changed")]
    ApplicationNotPending { id: Uuid, status: String },

    #[error("Order {0} already has an assigned executor; refresh the order and its applications")]
    OrderAlreadyAssigned(Uuid),

    // Orders
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Order is incomplete, missing: {}", .missing.join(", "))]
    IncompleteOrder { missing: Vec<&'static str> },

    #[error("Order {id} is already {status}")]
    TerminalOrder { id: Uuid, status: String },

    #[error("Cannot {action} an order in status {from}; expected {expected}")]
    IllegalTransition {
        from: String,
        action: &'static str,
        expected: String,
    },

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i16),

    #[error("Order {0} has already been rated by this party")]
    AlreadyRated(Uuid),

    #[error("Order {0} is being modified by another request; retry shortly")]
    OrderLocked(Uuid),

    #[error("{0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidSlug(_)
            | DomainError::SelfParent
            | DomainError::InvalidCoordinate { .. }
            | DomainError::InvalidRadius(_)
            | DomainError::IncompleteOrder { .. }
            | DomainError::InvalidRating(_) => ErrorKind::Validation,

            DomainError::DuplicateSlug(_)
            | DomainError::CyclicDependency { .. }
            | DomainError::HasChildren(_)
            | DomainError::DuplicateApplication { .. }
            | DomainError::OrderAlreadyAssigned(_)
            | DomainError::AlreadyRated(_) => ErrorKind::Conflict { retryable: false },

            DomainError::OrderLocked(_) | DomainError::CategoryTreeLocked => {
                ErrorKind::Conflict { retryable: true }
            }

            DomainError::ParentNotFound(_)
            | DomainError::CategoryNotFound(_)
            | DomainError::ApplicationNotFound(_)
            | DomainError::OrderNotFound(_) => ErrorKind::NotFound,

            DomainError::OrderNotAcceptingApplications(_)
            | DomainError::ApplicationNotPending { .. }
            | DomainError::TerminalOrder { .. }
            | DomainError::IllegalTransition { .. } => ErrorKind::IllegalTransition,

            DomainError::Forbidden(_) => ErrorKind::Authorization,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict { retryable: true })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = matches!(&self, AppError::Domain(e) if e.is_retryable());

        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::Domain(ref e) => {
                let message = e.to_string();
                match e.kind() {
                    ErrorKind::Validation => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        message.clone(),
                        Some(vec![message]),
                    ),
                    ErrorKind::Conflict { .. } => (StatusCode::CONFLICT, message, None),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, message, None),
                    ErrorKind::IllegalTransition => (StatusCode::CONFLICT, message, None),
                    ErrorKind::Authorization => (StatusCode::FORBIDDEN, message, None),
                }
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        let mut response = (status, body).into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_is_retryable() {
        let err = DomainError::OrderLocked(Uuid::new_v4());
        assert!(err.is_retryable());
        assert!(!DomainError::OrderAlreadyAssigned(Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_incomplete_order_lists_missing_fields() {
        let err = DomainError::IncompleteOrder {
            missing: vec!["address", "title"],
        };
        assert_eq!(err.to_string(), "Order is incomplete, missing: address, title");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_domain_errors_map_to_http_status() {
        let cases = [
            (DomainError::SelfParent, StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::DuplicateSlug("a".into()), StatusCode::CONFLICT),
            (
                DomainError::ApplicationNotFound(Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::IllegalTransition {
                    from: "completed".into(),
                    action: "complete",
                    expected: "waiting_confirmation".into(),
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::Forbidden("no".into()), StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
            assert!(!response.headers().contains_key(header::RETRY_AFTER));
        }
    }

    #[test]
    fn test_locked_order_asks_client_to_retry() {
        let response = AppError::from(DomainError::OrderLocked(Uuid::new_v4())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn test_locked_category_tree_asks_client_to_retry() {
        assert!(DomainError::CategoryTreeLocked.is_retryable());
        let response = AppError::from(DomainError::CategoryTreeLocked).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
