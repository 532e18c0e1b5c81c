//! JWT authentication for staff endpoints.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lambda_http::Request;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Staff tokens stay valid for one working day.
const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims carried in a staff bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Subject (staff email)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Role, currently always "admin"
    pub role: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Decoded identity attached to a request after verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedStaff {
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<StaffClaims> for AuthenticatedStaff {
    fn from(claims: StaffClaims) -> Self {
        Self {
            email: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

impl AuthenticatedStaff {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Issue a signed HS256 token for a staff member.
pub fn issue_token(secret: &str, email: &str, name: &str, role: &str) -> Result<String> {
    let now = Utc::now();
    let claims = StaffClaims {
        sub: email.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

/// Validate a bearer token and extract the staff identity.
pub fn verify_token(secret: &str, token: &str) -> Result<AuthenticatedStaff> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| Error::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims.into())
}

/// Request pipeline stage: verify the Authorization header and return the
/// caller's identity. Handlers call this before touching staff-only routes.
pub fn authorize(secret: &str, event: &Request) -> Result<AuthenticatedStaff> {
    let auth_header = event
        .headers()
        .get("Authorization")
        .or_else(|| event.headers().get("authorization"))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Auth("Missing Authorization header".to_string()))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(Error::Auth("Expected a bearer token".to_string()));
    }

    verify_token(secret, auth_header)
}

/// Like [`authorize`], but additionally requires the admin role.
pub fn authorize_admin(secret: &str, event: &Request) -> Result<AuthenticatedStaff> {
    let staff = authorize(secret, event)?;
    if !staff.is_admin() {
        return Err(Error::Unauthorized("Admin role required".to_string()));
    }
    Ok(staff)
}
