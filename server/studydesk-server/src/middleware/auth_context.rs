//! Authentication context extraction
//!
//! Bearer tokens are issued by an external identity provider and signed with
//! the shared HS256 secret from the configuration. The `sub` claim names the
//! user; the user row is loaded on every request so deactivation takes effect
//! immediately.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use database_layer::{Role, User};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::StudyDeskServer;

/// Claims StudyDesk reads from a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authenticated user of the current request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role() == Role::Admin
    }

    /// Reject non-admin callers
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Reject callers that neither own the record nor are admins
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.user.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(ApiError::missing_token)?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
    })
}

/// Verify a token and return the user ID it names
///
/// # Errors
///
/// Returns an authentication error for a bad signature, an expired token or
/// a `sub` that is not a UUID.
pub fn verify_token(token: &str, key: &DecodingKey, leeway: u64) -> Result<Uuid, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, key, &validation)
        .map_err(|_| ApiError::authentication("Could not validate credentials"))?;

    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ApiError::authentication("Could not validate credentials"))
}

#[async_trait]
impl FromRequestParts<StudyDeskServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &StudyDeskServer,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let user_id = verify_token(token, &server.jwt_key, server.config.jwt.leeway)?;

        let user = server
            .users
            .find(user_id)
            .await?
            .ok_or_else(|| ApiError::authentication("Could not validate credentials"))?;

        if !user.is_active {
            return Err(ApiError::inactive_user());
        }

        debug!(user_id = %user.id, role = %user.role, "Request authenticated");
        Ok(Self::new(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "coordinator@example.org".to_string(),
            full_name: "Study Coordinator".to_string(),
            role: role.to_string(),
            hospital_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn token(sub: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
            email: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let id = Uuid::new_v4();
        let t = token(&id.to_string(), Utc::now().timestamp() + 3600);
        assert_eq!(verify_token(&t, &DecodingKey::from_secret(SECRET), 0).unwrap(), id);
    }

    #[test]
    fn test_expired_token() {
        let t = token(&Uuid::new_v4().to_string(), Utc::now().timestamp() - 3600);
        let err = verify_token(&t, &DecodingKey::from_secret(SECRET), 30).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_wrong_secret() {
        let t = token(&Uuid::new_v4().to_string(), Utc::now().timestamp() + 3600);
        assert!(verify_token(&t, &DecodingKey::from_secret(b"other"), 0).is_err());
    }

    #[test]
    fn test_subject_must_be_uuid() {
        let t = token("42", Utc::now().timestamp() + 3600);
        assert!(verify_token(&t, &DecodingKey::from_secret(SECRET), 0).is_err());
    }

    #[test]
    fn test_role_checks() {
        let admin = AuthContext::new(user("admin"));
        let member = AuthContext::new(user("user"));

        assert!(admin.require_admin().is_ok());
        assert!(member.require_admin().is_err());
        assert!(member.require_owner_or_admin(member.user_id()).is_ok());
        assert!(member.require_owner_or_admin(Uuid::new_v4()).is_err());
        assert!(admin.require_owner_or_admin(Uuid::new_v4()).is_ok());
    }
}
