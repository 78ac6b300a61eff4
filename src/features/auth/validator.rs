use super::model::{AuthenticatedUser, CustomClaims};
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    claims_namespace: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    // Standard JWT claims (validated by jsonwebtoken library)
    sub: String,
    #[serde(rename = "iss")]
    _iss: String,
    #[serde(rename = "aud")]
    _aud: AudienceClaim,
    #[serde(rename = "exp")]
    _exp: u64,

    #[serde(default)]
    kind: Option<String>,

    // Namespaced custom claims live under a configurable key
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

/// Audience can be either a single string or an array of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum AudienceClaim {
    Single(String),
    Multiple(Vec<String>),
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        claims_namespace: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            claims_namespace,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        // Decode header to get kid
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        // Validate algorithm from header
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        // Get decoding key from JWKS
        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        self.to_authenticated_user(token_data.claims)
    }

    fn to_authenticated_user(&self, claims: Claims) -> Result<AuthenticatedUser, AppError> {
        if let Some(kind) = &claims.kind {
            if kind != "AccessToken" {
                return Err(AppError::Auth("Token is not an access token".to_string()));
            }
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

        let custom = match claims.extra.get(&self.claims_namespace) {
            Some(value) => serde_json::from_value::<CustomClaims>(value.clone())
                .map_err(|e| AppError::Auth(format!("Malformed custom claims: {}", e)))?,
            None => CustomClaims {
                roles: Vec::new(),
                user_type: Default::default(),
            },
        };

        Ok(AuthenticatedUser {
            user_id,
            sub: claims.sub,
            user_type: custom.user_type,
            roles: custom.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::UserType;

    const NAMESPACE: &str = "https://marketplace.local/claims";

    fn validator() -> JwtValidator {
        JwtValidator::new(
            Arc::new(JwksClient::new(
                "https://auth.example.test/oidc",
                Duration::from_secs(60),
            )),
            "https://auth.example.test/oidc".to_string(),
            "marketplace".to_string(),
            NAMESPACE.to_string(),
            Duration::from_secs(60),
        )
    }

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_custom_claims_resolve_user_type_and_roles() {
        let id = Uuid::new_v4();
        let c = claims(serde_json::json!({
            "sub": id.to_string(),
            "iss": "https://auth.example.test/oidc",
            "aud": ["marketplace"],
            "exp": 4_000_000_000u64,
            NAMESPACE: { "roles": ["admin"], "user_type": "both" }
        }));

        let user = validator().to_authenticated_user(c).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.user_type, UserType::Both);
        assert!(user.is_admin());
    }

    #[test]
    fn test_missing_custom_claims_default_to_customer() {
        let c = claims(serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "iss": "https://auth.example.test/oidc",
            "aud": "marketplace",
            "exp": 4_000_000_000u64
        }));

        let user = validator().to_authenticated_user(c).unwrap();
        assert_eq!(user.user_type, UserType::Customer);
        assert!(user.roles.is_empty());
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let c = claims(serde_json::json!({
            "sub": "not-a-uuid",
            "iss": "https://auth.example.test/oidc",
            "aud": "marketplace",
            "exp": 4_000_000_000u64
        }));

        assert!(matches!(
            validator().to_authenticated_user(c),
            Err(AppError::Auth(_))
        ));
    }
}
