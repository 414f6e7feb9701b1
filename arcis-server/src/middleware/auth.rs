//! Authentication middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, AppError};

/// Header carrying the device API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// User context extracted from JWT
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl UserContext {
    /// Name recorded next to comments and acknowledgments
    pub fn display_name(&self) -> String {
        self.email.clone().unwrap_or_else(|| self.user_id.to_string())
    }

    /// 0 when the token carries no known role
    pub fn clearance_level(&self) -> u8 {
        self.role
            .as_deref()
            .and_then(Clearance::from_role)
            .map_or(0, Clearance::level)
    }
}

/// Clearance ladder, one level per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Clearance {
    Viewer = 1,
    Operator = 2,
    Analyst = 3,
    Commander = 4,
    Admin = 5,
}

impl Clearance {
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "viewer" => Some(Clearance::Viewer),
            "operator" => Some(Clearance::Operator),
            "analyst" => Some(Clearance::Analyst),
            "commander" => Some(Clearance::Commander),
            "admin" => Some(Clearance::Admin),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

/// RBAC: Require at least the given clearance
pub fn require_clearance(user: &UserContext, required: Clearance) -> Result<(), AppError> {
    let actual = user.clearance_level();
    if actual < required.level() {
        tracing::warn!(
            "Clearance {} required but user {} has role {:?} (level {})",
            required.level(), user.user_id, user.role, actual
        );
        return Err(AppError::InsufficientClearance { required: required.level(), actual });
    }
    Ok(())
}

/// Device context extracted from a valid API key
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// Short, non-reversible hint of the key used, for logs
    pub key_hint: String,
    pub ip_address: Option<String>,
}

/// Middleware: Require user JWT authentication
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;
    let user_ctx = verify_user_token(&token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Middleware: Require a configured device API key
pub async fn require_device_key(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    if !state.config.accepts_device_key(key) {
        tracing::warn!("Rejected device request with unknown API key");
        return Err(AppError::InvalidApiKey);
    }

    let ip_address = req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());

    let device_ctx = DeviceContext {
        key_hint: key_hint(key),
        ip_address,
    };

    req.extensions_mut().insert(device_ctx);

    Ok(next.run(req).await)
}

/// Decode and validate an HS256 identity-provider token
pub fn verify_user_token(token: &str, secret: &str) -> Result<UserContext, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default()
    )?;

    let claims = token_data.claims;

    Ok(UserContext {
        user_id: Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?,
        email: claims.email,
        role: claims.role,
    })
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

fn key_hint(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("...{}", tail)
}

// Implement FromRequestParts for UserContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

// Implement FromRequestParts for DeviceContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for DeviceContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<DeviceContext>()
            .cloned()
            .ok_or(AppError::InvalidApiKey)
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, user_id: Uuid, exp: i64) -> String {
    issue_test_token_with_role(secret, user_id, exp, Some("operator"))
}

#[cfg(test)]
pub(crate) fn issue_test_token_with_role(secret: &str, user_id: Uuid, exp: i64, role: Option<&str>) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        email: Some("officer@arcis.test".to_string()),
        role: role.map(String::from),
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_verify_valid_token() {
        let user_id = Uuid::new_v4();
        let token = issue_test_token("secret", user_id, in_one_hour());
        let ctx = verify_user_token(&token, "secret").unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.display_name(), "officer@arcis.test");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_test_token("secret", Uuid::new_v4(), in_one_hour());
        assert!(matches!(verify_user_token(&token, "other"), Err(AppError::TokenInvalid)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let past = chrono::Utc::now().timestamp() - 3600;
        let token = issue_test_token("secret", Uuid::new_v4(), past);
        assert!(matches!(verify_user_token(&token, "secret"), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_clearance_ladder() {
        let user = |role: Option<&str>| UserContext {
            user_id: Uuid::new_v4(),
            email: None,
            role: role.map(String::from),
        };

        assert_eq!(user(Some("viewer")).clearance_level(), 1);
        assert_eq!(user(Some("admin")).clearance_level(), 5);
        assert_eq!(user(Some("janitor")).clearance_level(), 0);
        assert_eq!(user(None).clearance_level(), 0);

        assert!(require_clearance(&user(Some("commander")), Clearance::Commander).is_ok());
        assert!(require_clearance(&user(Some("admin")), Clearance::Commander).is_ok());
        assert!(matches!(
            require_clearance(&user(Some("analyst")), Clearance::Commander),
            Err(AppError::InsufficientClearance { required: 4, actual: 3 })
        ));
        assert!(require_clearance(&user(None), Clearance::Viewer).is_err());
    }

    #[test]
    fn test_key_hint_hides_key() {
        assert_eq!(key_hint("device-key-1234"), "...1234");
        assert_eq!(key_hint("ab"), "...ab");
    }
}
