#[cfg(test)]
use crate::features::auth::model::{AuthenticatedUser, UserType};

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn test_user(user_type: UserType, roles: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: uuid::Uuid::new_v4(),
        sub: "test-sub".to_string(),
        user_type,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// Wrap a router so every request carries `user`, as the JWT middleware would.
#[cfg(test)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                let response: Response = next.run(request).await;
                response
            }
        },
    ))
}
