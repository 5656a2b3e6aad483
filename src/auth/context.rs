//! Request-scoped identity attached by the authentication gate.

use std::fmt;

use crate::auth::token::token_fingerprint;
use crate::db::AuthorRecord;
use crate::types::{AuthorId, TokenFingerprint};

/// The author a request acts as, plus the exact token it presented.
///
/// Handlers receive this only after the token has been verified and found
/// in the author's active list. It is immutable once created.
#[derive(Clone)]
pub struct AuthContext {
    author: AuthorRecord,
    token: String,
    fingerprint: TokenFingerprint,
}

impl AuthContext {
    pub fn new(author: AuthorRecord, token: String) -> Self {
        let fingerprint = token_fingerprint(&token);
        Self {
            author,
            token,
            fingerprint,
        }
    }

    pub fn author(&self) -> &AuthorRecord {
        &self.author
    }

    pub fn author_id(&self) -> &AuthorId {
        &self.author.id
    }

    /// The raw token, needed to revoke exactly this session.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn fingerprint(&self) -> &TokenFingerprint {
        &self.fingerprint
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("author", &self.author)
            .field("token", &self.fingerprint)
            .finish()
    }
}
