// ABOUTME: Bearer token validation resolving the authenticated user and tenant
// ABOUTME: HS256 JWTs with claims {sub, tenant_id, iat, exp}; tokens are minted by the identity provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Authentication
//!
//! Every `/api` handler resolves identity through [`AuthManager::authenticate_request`].
//! Token issuance lives with the identity provider; [`AuthManager::generate_token`]
//! exists for tooling and tests that share the secret.

use std::fmt;

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::models::{ChatContext, TenantId};

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Signature or claims are invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is not a well-formed JWT
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenExpired { expired_at } => write!(
                f,
                "JWT token expired at {}",
                expired_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Self::TokenInvalid { reason } => write!(f, "JWT token is invalid: {reason}"),
            Self::TokenMalformed { details } => write!(f, "JWT token is malformed: {details}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Tenant ID
    pub tenant_id: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
}

/// Identity resolved from a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    /// Authenticated user
    pub user_id: Uuid,
    /// Tenant of the user
    pub tenant_id: TenantId,
}

impl AuthResult {
    /// Start a chat context for this identity
    #[must_use]
    pub const fn chat_context(&self) -> ChatContext {
        ChatContext::new(self.user_id, self.tenant_id)
    }
}

/// HS256 token validator
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl AuthManager {
    /// Create a manager from a shared secret
    #[must_use]
    pub fn new(secret: &[u8], token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry_hours,
        }
    }

    /// Create a manager from configuration
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_expiry_hours)
    }

    /// Mint a token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails
    pub fn generate_token(&self, user_id: Uuid, tenant_id: TenantId) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode JWT: {e}")))
    }

    /// Validate signature and expiry
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] describing why the token was rejected
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(token, &e))
    }

    fn convert_jwt_error(token: &str, e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        match e.kind() {
            ErrorKind::ExpiredSignature => {
                let expired_at = Self::unverified_expiry(token).unwrap_or_else(Utc::now);
                JwtValidationError::TokenExpired { expired_at }
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtValidationError::TokenMalformed {
                details: e.to_string(),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: e.to_string(),
            },
        }
    }

    /// Read `exp` from a token whose signature was already checked
    fn unverified_expiry(token: &str) -> Option<DateTime<Utc>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp, 0)
    }

    /// Resolve identity from an `Authorization` header value
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when the header is missing and `AuthInvalid`
    /// when the token or its claims are rejected
    pub fn authenticate_request(&self, auth_header: Option<&str>) -> AppResult<AuthResult> {
        let Some(header) = auth_header else {
            TenantLogger::log_auth_event(None, None, false, Some("missing authorization header"));
            return Err(AppError::auth_required());
        };

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TenantLogger::log_auth_event(None, None, false, Some("not a bearer token"));
                AppError::auth_invalid("Authorization header must be a bearer token")
            })?;

        let claims = self.validate_token(token).map_err(|e| {
            let details = e.to_string();
            TenantLogger::log_auth_event(None, None, false, Some(&details));
            AppError::auth_invalid(details)
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::auth_invalid("Invalid user ID in token"))?;
        let tenant_id = claims
            .tenant_id
            .parse::<TenantId>()
            .map_err(|_| AppError::auth_invalid("Invalid tenant ID in token"))?;

        TenantLogger::log_auth_event(Some(user_id), Some(tenant_id), true, None);
        Ok(AuthResult { user_id, tenant_id })
    }

    /// Resolve identity from request headers
    ///
    /// # Errors
    ///
    /// See [`Self::authenticate_request`]
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthResult> {
        let header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        self.authenticate_request(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    const SECRET: &[u8] = b"test-secret-with-enough-entropy";

    #[test]
    fn test_token_round_trip_resolves_identity() {
        let manager = AuthManager::new(SECRET, 1);
        let user_id = Uuid::new_v4();
        let tenant_id = TenantId::new();
        let token = manager.generate_token(user_id, tenant_id).unwrap();

        let auth = manager
            .authenticate_request(Some(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(auth, AuthResult { user_id, tenant_id });
        assert_eq!(auth.chat_context().tenant_id, tenant_id);
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let manager = AuthManager::new(SECRET, 1);
        assert_eq!(
            manager.authenticate_request(None).unwrap_err().code,
            ErrorCode::AuthRequired
        );
        assert_eq!(
            manager.authenticate_request(Some("Basic abc")).unwrap_err().code,
            ErrorCode::AuthInvalid
        );
        assert!(matches!(
            manager.validate_token("not-a-jwt"),
            Err(JwtValidationError::TokenMalformed { .. })
        ));
    }

    #[test]
    fn test_foreign_secret_and_expiry_are_rejected() {
        let manager = AuthManager::new(SECRET, 1);
        let other = AuthManager::new(b"another-secret", 1);
        let token = other.generate_token(Uuid::new_v4(), TenantId::new()).unwrap();
        assert!(matches!(
            manager.validate_token(&token),
            Err(JwtValidationError::TokenInvalid { .. })
        ));

        let expired = AuthManager::new(SECRET, -2)
            .generate_token(Uuid::new_v4(), TenantId::new())
            .unwrap();
        assert!(matches!(
            manager.validate_token(&expired),
            Err(JwtValidationError::TokenExpired { .. })
        ));
    }
}
