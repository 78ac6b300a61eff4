use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// JSON body that has been deserialized and passed its `validator` rules.
///
/// Well-formed JSON of the wrong shape (missing field, unknown enum value)
/// and failed field rules are both validation errors; anything that is not
/// JSON at all is a bad request.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_error)?;

        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(Self(value))
    }
}

fn json_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => AppError::Validation(err.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Expected a JSON body (Content-Type: application/json)".to_string())
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
