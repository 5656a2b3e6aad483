//! Signing and verification of session tokens.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::auth::credentials::CredentialStore;
use crate::auth::extractor::AuthError;
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::types::{AuthorId, TokenFingerprint};

/// Claims embedded in every session token.
///
/// Only the author id is identifying; `jti` makes every issued token unique
/// even when two are signed within the same second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Author id
    pub sub: String,
    /// Random token id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues, verifies and revokes session tokens.
///
/// The signing secret is fixed at construction and never changes for the
/// lifetime of the service.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
    credentials: Arc<CredentialStore>,
}

impl TokenService {
    pub fn new(config: &AuthConfig, credentials: Arc<CredentialStore>) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl_seconds: i64::try_from(config.token_ttl_seconds).unwrap_or(i64::MAX),
            credentials,
        }
    }

    /// Sign a token for `author_id` without recording it anywhere.
    pub fn sign(&self, author_id: &AuthorId) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            sub: author_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Check the signature and expiry of `token` and return its claims.
    pub fn verify(&self, token: &str) -> std::result::Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Sign a token and append it to the author's active token list.
    pub async fn issue_token(&self, author_id: &AuthorId) -> Result<String> {
        let token = self.sign(author_id)?;
        self.credentials.push_token(author_id, &token).await?;
        info!(
            "Issued token {} for author {}",
            token_fingerprint(&token),
            author_id
        );
        Ok(token)
    }

    /// Remove exactly this token from the author's list.
    pub async fn revoke_token(&self, author_id: &AuthorId, token: &str) -> Result<()> {
        self.credentials.remove_token(author_id, token).await?;
        info!(
            "Revoked token {} for author {}",
            token_fingerprint(token),
            author_id
        );
        Ok(())
    }

    /// Remove every token the author holds.
    pub async fn revoke_all(&self, author_id: &AuthorId) -> Result<()> {
        self.credentials.clear_tokens(author_id).await?;
        debug!("Revoked all tokens for author {}", author_id);
        Ok(())
    }
}

/// Short hash of a token for log lines (never log the token itself).
pub fn token_fingerprint(token: &str) -> TokenFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    TokenFingerprint::new(&digest[..12])
}
