use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, routing::get, Json, Router};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

/// Bearer-token claims issued by the external identity provider. The `admin`
/// flag is the role bit the workflow engine trusts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Stable user id.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub iat: usize,
    pub exp: usize,
}

impl AuthClaims {
    /// Display name for attendance records, falling back to the email.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub admin: bool,
}

/// Echo of the authenticated identity, for the frontend session bootstrap.
async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: claims.sub,
        email: claims.email,
        name: claims.name,
        admin: claims.admin,
    })
}

// ============================================================================
// Auth Middleware / Extractors
// ============================================================================

/// Extractor for any authenticated user.
pub struct AuthUser(pub AuthClaims);

/// Extractor that additionally requires the admin role bit.
pub struct AdminUser(pub AuthClaims);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!("Missing or invalid Authorization header");
            AppError::Unauthorized
        })?;

    if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
        tracing::debug!("Authorization header doesn't start with 'Bearer '");
        return Err(AppError::Unauthorized);
    }

    let token = auth_header[7..].trim();
    if token.is_empty() {
        tracing::debug!("Empty bearer token in Authorization header");
        return Err(AppError::Unauthorized);
    }

    Ok(token)
}

fn decode_claims(state: &Arc<AppState>, token: &str) -> Result<AuthClaims, AppError> {
    let data = decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_claims(state, token).map_err(|e| {
            tracing::debug!("Failed to decode auth token: {:?}", e);
            e
        })?;
        Ok(AuthUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(claims))
    }
}
