use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::sql::Datetime;

use crate::types::{AuthorId, DocumentId};

/// Projection used for every author read.
///
/// The record key is returned as a plain string so no `RecordId` ever leaves
/// the storage layer.
pub const AUTHOR_FIELDS: &str =
    "record::id(id) AS id, name, email, password, age, tokens, avatar, created_at, updated_at";

/// Persisted author, exactly as stored.
///
/// Not `Serialize`: the password hash and session tokens must
/// never be rendered. Clients only ever see [`AuthorProfile`].
#[derive(Clone, Deserialize)]
pub struct AuthorRecord {
    pub id: AuthorId,
    pub name: String,
    pub email: String,
    /// bcrypt hash of the password
    pub password: String,
    pub age: i64,
    /// Active session tokens, oldest first
    pub tokens: Vec<String>,
    /// PNG bytes, base64 encoded
    pub avatar: Option<String>,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

impl fmt::Debug for AuthorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("tokens", &self.tokens.len())
            .field("has_avatar", &self.avatar.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthorRecord {
    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn profile(&self) -> AuthorProfile {
        AuthorProfile::from(self)
    }
}

/// Client-facing projection of an author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorProfile {
    #[serde(rename = "_id")]
    pub id: AuthorId,
    pub name: String,
    pub email: String,
    pub age: i64,
    #[serde(rename = "createdAt")]
    pub created_at: Option<Datetime>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<Datetime>,
}

impl From<&AuthorRecord> for AuthorProfile {
    fn from(record: &AuthorRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            age: record.age,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// Payload used when inserting a new author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorCreate {
    pub name: String,
    pub email: String,
    /// Raw password; hashed by the credential store before insertion.
    pub password: String,
    #[serde(default)]
    pub age: i64,
}

/// Persisted post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    #[serde(rename(serialize = "_id"))]
    pub id: DocumentId,
    pub title: String,
    pub body: String,
    pub completed: bool,
    pub owner: AuthorId,
    #[serde(rename(serialize = "createdAt"))]
    pub created_at: Option<Datetime>,
    #[serde(rename(serialize = "updatedAt"))]
    pub updated_at: Option<Datetime>,
}

/// Persisted comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentRecord {
    #[serde(rename(serialize = "_id"))]
    pub id: DocumentId,
    pub body: String,
    pub completed: bool,
    pub owner: AuthorId,
    #[serde(rename(serialize = "createdAt"))]
    pub created_at: Option<Datetime>,
    #[serde(rename(serialize = "updatedAt"))]
    pub updated_at: Option<Datetime>,
}
