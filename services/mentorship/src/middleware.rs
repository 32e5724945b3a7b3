//! Authentication middleware for JWT token validation
//!
//! Tokens are issued by the auth service; this service only verifies them
//! and turns the claims into an explicit [`Caller`].

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, models::Caller, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User roles
    pub roles: Vec<String>,
    /// User permissions
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Verifies RS256 access tokens
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier from a PEM public key
    pub fn from_rsa_pem(public_key: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Build a verifier from a PEM string or a path to a PEM file
    pub fn from_key_or_path(public_key: &str) -> Result<Self> {
        // If the public key looks like a file path, read from file (try CWD, then crate root)
        let pem = if public_key.starts_with("-----BEGIN") {
            public_key.to_string()
        } else {
            std::fs::read_to_string(public_key)
                .or_else(|_| {
                    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
                    path.push(public_key);
                    std::fs::read_to_string(path)
                })
                .map_err(|e| anyhow::anyhow!("Failed to read public key file: {}", e))?
                .trim()
                .to_string()
        };

        Self::from_rsa_pem(&pem)
    }

    /// Validate an access token and resolve the caller it identifies
    pub fn verify(&self, token: &str) -> Result<Caller, ApiError> {
        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            })?;

        if token_data.claims.token_type != TokenType::Access {
            warn!("Rejected non-access token for {}", token_data.claims.sub);
            return Err(ApiError::Unauthorized);
        }

        Ok(Caller::from_claims(
            token_data.claims.sub,
            &token_data.claims.roles,
        ))
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;

    let caller = state.verifier.verify(bearer.token())?;

    // Insert the caller into the request extensions
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
