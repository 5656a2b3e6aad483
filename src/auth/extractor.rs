//! Authentication gate for HTTP requests.

use std::fmt;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::auth::context::AuthContext;
use crate::auth::credentials::CredentialStore;
use crate::auth::token::{TokenService, token_fingerprint};
use crate::error::Error;
use crate::types::AuthorId;

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No bearer token in the request
    MissingToken,
    /// Bad signature, malformed payload or expired token
    InvalidToken(String),
    /// Token names an author that no longer exists
    UnknownAuthor,
    /// Token is well-formed but no longer in the author's active list
    RevokedToken,
    /// Database error
    DatabaseError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Authentication required"),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            Self::UnknownAuthor => write!(f, "Token owner does not exist"),
            Self::RevokedToken => write!(f, "Token has been revoked"),
            Self::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Token problems are reported to the client as a bare 401; a failed
/// lookup is a storage failure like any other.
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(msg) => Error::Internal(msg),
            _ => Error::Unauthorized,
        }
    }
}

/// Resolves a bearer token to the author it belongs to.
pub struct AuthGate {
    tokens: Arc<TokenService>,
    credentials: Arc<CredentialStore>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            tokens,
            credentials,
        }
    }

    /// Authenticate from the raw `Authorization` header value.
    ///
    /// The token must verify cryptographically AND still be listed on the
    /// author, so logged-out tokens are refused even though they are valid
    /// JWTs.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = authorization
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.tokens.verify(token)?;
        let author_id = AuthorId::new(claims.sub);

        let author = self
            .credentials
            .find_by_id(&author_id)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UnknownAuthor)?;

        if !author.has_token(token) {
            return Err(AuthError::RevokedToken);
        }

        debug!(
            "Token {} authenticated author {}",
            token_fingerprint(token),
            author.id
        );
        Ok(AuthContext::new(author, token.to_string()))
    }
}

/// Extractor that requires authentication.
/// Returns 401 before the handler runs if the gate refuses the request.
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        state.gate.authenticate(authorization).await.map_err(|e| {
            match &e {
                AuthError::DatabaseError(msg) => {
                    tracing::error!("Authentication lookup failed: {}", msg)
                }
                other => warn!("Rejected request on {}: {}", parts.uri.path(), other),
            }
            Error::from(e)
        })
    }
}
