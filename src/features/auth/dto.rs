use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::model::{AuthenticatedUser, Capabilities, UserType};

/// DTO for /auth/me response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub user_id: Uuid,
    pub user_type: UserType,
    pub roles: Vec<String>,
    pub capabilities: Capabilities,
}

impl From<AuthenticatedUser> for MeResponseDto {
    fn from(user: AuthenticatedUser) -> Self {
        let capabilities = user.capabilities();
        Self {
            user_id: user.user_id,
            user_type: user.user_type,
            roles: user.roles,
            capabilities,
        }
    }
}
