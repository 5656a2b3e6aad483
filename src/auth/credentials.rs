//! Author storage: registration, credential checks, profile and token list
//! maintenance, and cascading deletion.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::db::{AUTHOR_FIELDS, AuthorCreate, AuthorRecord, Db};
use crate::error::{Error, Result};
use crate::resources::OWNED_TABLES;
use crate::types::{AuthorId, generate_key};
use crate::validation::{FieldSpec, Mode, Rule, Schema, ValidationErrors, ensure_updatable};

pub const AUTHOR_SCHEMA: Schema = Schema {
    resource: "author",
    fields: &[
        FieldSpec {
            name: "name",
            rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::NonEmpty],
        },
        FieldSpec {
            name: "email",
            rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::Lowercase, Rule::Email],
        },
        FieldSpec {
            name: "password",
            rules: &[
                Rule::Required,
                Rule::Text,
                Rule::Trim,
                Rule::MinLength(7),
                Rule::Forbids("password"),
            ],
        },
        FieldSpec {
            name: "age",
            rules: &[Rule::Integer, Rule::NonNegative],
        },
    ],
};

/// Fields an author may change on their own profile.
pub const AUTHOR_UPDATABLE: &[&str] = &["name", "email", "password", "age"];

/// Store for author records and their credentials.
pub struct CredentialStore {
    db: Db,
    bcrypt_cost: u32,
    /// Hash checked when no author matches an e-mail, so that an unknown
    /// address costs the same as a wrong password.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(db: Db, config: &AuthConfig) -> Result<Self> {
        let dummy_hash = bcrypt::hash(generate_key(), config.bcrypt_cost)
            .map_err(|e| Error::Internal(format!("Failed to prepare password hasher: {}", e)))?;
        Ok(Self {
            db,
            bcrypt_cost: config.bcrypt_cost,
            dummy_hash,
        })
    }

    /// Create a new author from a registration payload.
    pub async fn register(&self, mut input: Map<String, Value>) -> Result<AuthorRecord> {
        AUTHOR_SCHEMA.validate(&mut input, Mode::Create)?;
        let create: AuthorCreate = serde_json::from_value(Value::Object(AUTHOR_SCHEMA.project(input)))
            .map_err(|e| Error::Internal(format!("Validated author did not deserialize: {}", e)))?;

        if self.find_by_email(&create.email).await?.is_some() {
            return Err(duplicate_email().into());
        }

        let id = generate_key();
        let password = self.hash_password(create.password).await?;
        let query = "CREATE type::thing('author', $id) CONTENT $content RETURN NONE";
        let content = json!({
            "name": create.name,
            "email": create.email,
            "password": password,
            "age": create.age,
            "tokens": [],
        });

        self.db
            .query(query)
            .bind(("id", id.clone()))
            .bind(("content", content))
            .await?
            .check()
            .map_err(map_unique_violation)?;

        let author = self.require(&AuthorId::new(id)).await?;
        info!("Registered author {}", author.id);
        Ok(author)
    }

    /// Get an author by id.
    pub async fn find_by_id(&self, id: &AuthorId) -> Result<Option<AuthorRecord>> {
        let query = format!("SELECT {AUTHOR_FIELDS} FROM type::thing('author', $id)");

        let mut res = self.db.query(query).bind(("id", id.to_string())).await?;

        let authors: Vec<AuthorRecord> = res.take(0)?;
        Ok(authors.into_iter().next())
    }

    /// Get an author by (already normalised) e-mail address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AuthorRecord>> {
        let query = format!("SELECT {AUTHOR_FIELDS} FROM author WHERE email = $email LIMIT 1");

        let mut res = self
            .db
            .query(query)
            .bind(("email", email.to_string()))
            .await?;

        let authors: Vec<AuthorRecord> = res.take(0)?;
        Ok(authors.into_iter().next())
    }

    async fn require(&self, id: &AuthorId) -> Result<AuthorRecord> {
        self.find_by_id(id).await?.ok_or(Error::NotFound)
    }

    /// Resolve a login attempt.
    ///
    /// Every failure yields the same [`Error::Authentication`], whether the
    /// address is unknown or the password is wrong.
    pub async fn find_by_credentials(&self, email: &str, password: &str) -> Result<AuthorRecord> {
        let email = email.trim().to_lowercase();
        let author = self.find_by_email(&email).await?;

        let hash = author
            .as_ref()
            .map(|a| a.password.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let matches = self.verify_password(password.to_string(), hash).await?;

        match author {
            Some(author) if matches => Ok(author),
            _ => {
                warn!("Failed login attempt");
                Err(Error::Authentication)
            }
        }
    }

    /// Apply a profile patch. Re-hashes the password when it is supplied.
    pub async fn update_profile(
        &self,
        author: &AuthorRecord,
        mut patch: Map<String, Value>,
    ) -> Result<AuthorRecord> {
        ensure_updatable(&patch, AUTHOR_UPDATABLE)?;
        AUTHOR_SCHEMA.validate(&mut patch, Mode::Patch)?;

        if patch.is_empty() {
            return self.require(&author.id).await;
        }

        if let Some(email) = patch.get("email").and_then(Value::as_str)
            && email != author.email
            && self.find_by_email(email).await?.is_some()
        {
            return Err(duplicate_email().into());
        }

        if let Some(Value::String(raw)) = patch.remove("password") {
            let hash = self.hash_password(raw).await?;
            patch.insert("password".to_string(), Value::String(hash));
        }

        let fields: Vec<String> = patch.keys().cloned().collect();
        self.db
            .query("UPDATE type::thing('author', $id) MERGE $patch RETURN NONE")
            .bind(("id", author.id.to_string()))
            .bind(("patch", Value::Object(patch)))
            .await?
            .check()
            .map_err(map_unique_violation)?;

        info!("Author {} updated fields [{}]", author.id, fields.join(", "));
        self.require(&author.id).await
    }

    pub async fn push_token(&self, id: &AuthorId, token: &str) -> Result<()> {
        self.db
            .query("UPDATE type::thing('author', $id) SET tokens += $token_value RETURN NONE")
            .bind(("id", id.to_string()))
            .bind(("token_value", token.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn remove_token(&self, id: &AuthorId, token: &str) -> Result<()> {
        self.db
            .query("UPDATE type::thing('author', $id) SET tokens -= $token_value RETURN NONE")
            .bind(("id", id.to_string()))
            .bind(("token_value", token.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn clear_tokens(&self, id: &AuthorId) -> Result<()> {
        self.db
            .query("UPDATE type::thing('author', $id) SET tokens = [] RETURN NONE")
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    /// Store (or with `None`, remove) the author's avatar PNG.
    pub async fn set_avatar(&self, id: &AuthorId, png: Option<Vec<u8>>) -> Result<()> {
        let encoded = png.map(|bytes| BASE64.encode(bytes));
        let query = if encoded.is_some() {
            "UPDATE type::thing('author', $id) SET avatar = $avatar RETURN NONE"
        } else {
            "UPDATE type::thing('author', $id) UNSET avatar RETURN NONE"
        };

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("avatar", encoded))
            .await?
            .check()?;
        debug!("Avatar updated for author {}", id);
        Ok(())
    }

    /// Fetch the decoded avatar PNG, if the author exists and has one.
    pub async fn avatar(&self, id: &AuthorId) -> Result<Option<Vec<u8>>> {
        let Some(author) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        author
            .avatar
            .map(|encoded| {
                BASE64
                    .decode(encoded)
                    .map_err(|e| Error::Internal(format!("Stored avatar is corrupt: {}", e)))
            })
            .transpose()
    }

    /// Delete an author together with every post and comment it owns.
    ///
    /// All deletes run in one transaction: either the author and all owned
    /// documents are gone, or nothing changed.
    pub async fn delete_author(&self, id: &AuthorId) -> Result<AuthorRecord> {
        let author = self.require(id).await?;

        let mut query = String::from("BEGIN TRANSACTION;\n");
        for table in OWNED_TABLES {
            query.push_str(&format!("DELETE {table} WHERE owner = $owner;\n"));
        }
        query.push_str("DELETE type::thing('author', $owner);\nCOMMIT TRANSACTION;");

        self.db
            .query(query)
            .bind(("owner", id.to_string()))
            .await?
            .check()?;

        info!("Deleted author {} and all owned documents", id);
        Ok(author)
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .map_err(|e| Error::Internal(format!("Failed to verify password: {}", e)))
    }
}

fn duplicate_email() -> ValidationErrors {
    ValidationErrors::single("email", "is already registered").with_message("Validation failed")
}

/// Concurrent registrations with the same address race past the lookup and
/// hit the unique e-mail index instead.
fn map_unique_violation(err: surrealdb::Error) -> Error {
    let message = err.to_string();
    if message.contains("author_email") || message.contains("already contains") {
        duplicate_email().into()
    } else {
        Error::Database(err)
    }
}
