use crate::features::auth::dto::MeResponseDto;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::ApiResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user and what they may do", body = ApiResponse<MeResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(user: AuthenticatedUser) -> Json<ApiResponse<MeResponseDto>> {
    Json(ApiResponse::success(Some(user.into()), None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::UserType;
    use crate::shared::test_helpers::{test_user, with_user};
    use axum::{http::StatusCode, routing::get, Router};
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_me_reports_capabilities() {
        let user = test_user(UserType::Both, &["moderator"]);
        let user_id = user.user_id;
        let app = with_user(Router::new().route("/api/auth/me", get(get_me)), user);
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/auth/me").await;
        response.assert_status(StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["user_id"], user_id.to_string());
        assert_eq!(body["data"]["user_type"], "both");
        assert_eq!(body["data"]["capabilities"]["can_bid"], true);
        assert_eq!(body["data"]["capabilities"]["can_resolve_disputes"], true);
        assert_eq!(body["data"]["capabilities"]["can_manage_categories"], false);
    }

    #[tokio::test]
    async fn test_me_without_user_is_unauthorized() {
        let app = Router::new().route("/api/auth/me", get(get_me));
        let server = TestServer::new(app).unwrap();

        server
            .get("/api/auth/me")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
