//! Access-token verification.
//!
//! Tokens arrive as `Authorization: Bearer <jwt>` or, for browser WebSocket
//! clients that cannot set headers, as the `access_token` query parameter.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Query};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use lookout_core::Claims;
use lookout_settings::AuthSettings;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::server::AppState;

/// Authentication failures. All map to `401 Unauthorized`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token in the header or query string.
    #[error("missing access token")]
    MissingToken,
    /// The token did not verify.
    #[error("invalid access token: {0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Turns a raw token into [`Claims`].
pub trait ClaimsResolver: Send + Sync {
    /// Verify `token` and return its claims.
    fn resolve(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Token payload. `sub` carries the numeric user ID.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessToken {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    agency_id: Option<i64>,
    #[serde(default)]
    station_id: Option<i64>,
}

/// HS256 JWT verification.
pub struct JwtClaimsResolver {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtClaimsResolver {
    /// Build from a shared secret. An empty secret rejects every token.
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    /// Build from the `auth` settings section.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.jwt_secret, settings.issuer.as_deref())
    }
}

impl ClaimsResolver for JwtClaimsResolver {
    fn resolve(&self, token: &str) -> Result<Claims, AuthError> {
        let Some(key) = &self.key else {
            return Err(AuthError::InvalidToken("no signing secret configured".into()));
        };
        let data = decode::<AccessToken>(token, key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "expired".to_string(),
                ErrorKind::InvalidSignature => "bad signature".to_string(),
                ErrorKind::InvalidIssuer => "wrong issuer".to_string(),
                _ => e.to_string(),
            };
            debug!(%reason, "token rejected");
            AuthError::InvalidToken(reason)
        })?;

        let token = data.claims;
        let user_id = token
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken(format!("non-numeric subject {:?}", token.sub)))?;
        Ok(Claims {
            user_id,
            role: token.role,
            agency_id: token.agency_id,
            station_id: token.station_id,
        })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Pull the raw token from the request, header first.
fn extract_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token)
            .filter(|t| !t.is_empty())
    })
}

/// Extractor for routes that require a verified caller.
#[derive(Clone, Debug)]
pub struct Authenticated(pub Claims);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(AuthError::MissingToken)?;
        state.resolver.resolve(&token).map(Authenticated)
    }
}

/// Shared resolver handle.
pub type SharedResolver = Arc<dyn ClaimsResolver>;
