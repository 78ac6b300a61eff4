//! Capability-based authorization guards.
//!
//! Each guard extracts the authenticated user placed in request extensions by
//! the auth middleware and checks one entry of its resolved [`Capabilities`].
//! Ownership (customer owns order, executor owns application) is enforced by
//! the order engine itself, not here.
//!
//! [`Capabilities`]: crate::features::auth::model::Capabilities

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

/// Guard for customers posting and managing their own orders.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireCustomer(user): RequireCustomer) { ... }
/// ```
pub struct RequireCustomer(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.capabilities().can_manage_orders {
            return Err(AppError::Forbidden(
                "Customer account required".to_string(),
            ));
        }

        Ok(RequireCustomer(user))
    }
}

/// Guard for executors bidding on orders.
pub struct RequireExecutor(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireExecutor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.capabilities().can_bid {
            return Err(AppError::Forbidden(
                "Executor account required".to_string(),
            ));
        }

        Ok(RequireExecutor(user))
    }
}

/// Guard for editing the category taxonomy (admin role).
pub struct RequireCategoryManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireCategoryManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.capabilities().can_manage_categories {
            return Err(AppError::Forbidden(
                "Category management requires admin access".to_string(),
            ));
        }

        Ok(RequireCategoryManager(user))
    }
}

/// Guard for settling disputed orders (admin or moderator role).
pub struct RequireDisputeResolver(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireDisputeResolver
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.capabilities().can_resolve_disputes {
            return Err(AppError::Forbidden(
                "Dispute resolution requires admin or moderator access".to_string(),
            ));
        }

        Ok(RequireDisputeResolver(user))
    }
}

/// Guard for reading the bids on an order: its customer, or a moderator
/// looking into the order. Which order the customer owns is checked later.
pub struct RequireBidReviewer(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireBidReviewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;
        let capabilities = user.capabilities();

        if !capabilities.can_manage_orders && !capabilities.can_resolve_disputes {
            return Err(AppError::Forbidden(
                "Customer account or moderator access required".to_string(),
            ));
        }

        Ok(RequireBidReviewer(user))
    }
}
