//! Authentication middleware
//!
//! Admin routes take an [`AdminClaims`] extractor, which verifies an HS256
//! bearer token and requires the `admin` role.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use crate::error::ApiError;
use crate::ApiState;

/// Role required on admin routes
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

/// Verified administrator
#[derive(Debug, Clone)]
pub struct AdminClaims(pub JwtClaims);

/// Sign a token for `claims`
pub fn issue_token(claims: &JwtClaims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verify JWT token
pub fn verify_jwt(token: &str, secret: &str) -> Option<JwtClaims> {
    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .ok()
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AdminClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

        let claims = verify_jwt(token, &state.jwt_secret).ok_or_else(|| {
            tracing::warn!("rejected invalid admin token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        if claims.role != ADMIN_ROLE {
            tracing::warn!(sub = %claims.sub, role = %claims.role, "non-admin token on admin route");
            return Err(ApiError::Forbidden("admin role required".into()));
        }
        Ok(Self(claims))
    }
}
