use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::constants::{ROLE_ADMIN, ROLE_MODERATOR};

/// Which side(s) of the marketplace an account participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Customer,
    Executor,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub sub: String,
    pub user_type: UserType,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn is_moderator(&self) -> bool {
        self.has_role(ROLE_MODERATOR)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::resolve(self.user_type, self.is_admin(), self.is_moderator())
    }

    /// Identity handed to the order engine
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            capabilities: self.capabilities(),
        }
    }
}

/// What an account may do, resolved once from its user type and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Post, publish and manage own orders
    pub can_manage_orders: bool,
    /// Bid on other customers' orders and fulfil them
    pub can_bid: bool,
    /// Edit the category taxonomy
    pub can_manage_categories: bool,
    /// Settle disputed orders and cancel on anyone's behalf
    pub can_resolve_disputes: bool,
}

impl Capabilities {
    pub fn resolve(user_type: UserType, is_admin: bool, is_moderator: bool) -> Self {
        let (can_manage_orders, can_bid) = match user_type {
            UserType::Customer => (true, false),
            UserType::Executor => (false, true),
            UserType::Both => (true, true),
        };

        Self {
            can_manage_orders,
            can_bid,
            can_manage_categories: is_admin,
            can_resolve_disputes: is_admin || is_moderator,
        }
    }
}

/// An authenticated caller as seen by the order engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub user_type: UserType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: UserType, roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            sub: "sub".to_string(),
            user_type,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_customer_capabilities() {
        let caps = user(UserType::Customer, &[]).capabilities();
        assert!(caps.can_manage_orders);
        assert!(!caps.can_bid);
        assert!(!caps.can_manage_categories);
        assert!(!caps.can_resolve_disputes);
    }

    #[test]
    fn test_both_user_type_can_post_and_bid() {
        let caps = user(UserType::Both, &[]).capabilities();
        assert!(caps.can_manage_orders && caps.can_bid);
    }

    #[test]
    fn test_admin_and_moderator_roles() {
        let admin = user(UserType::Executor, &["admin"]).capabilities();
        assert!(admin.can_manage_categories && admin.can_resolve_disputes);
        assert!(!admin.can_manage_orders);

        let moderator = user(UserType::Customer, &["moderator"]).capabilities();
        assert!(moderator.can_resolve_disputes);
        assert!(!moderator.can_manage_categories);
    }
}
