//! Ownership-scoped documents.
//!
//! Posts and comments share one contract: every read and write is filtered
//! by the requesting author's id, and a document owned by someone else is
//! reported exactly like one that does not exist. The rule lives once, in
//! [`OwnedRepository`]; each resource only declares its table, fields and
//! which of them may be patched or sorted on.

mod comment;
mod post;
mod query;
mod repository;

pub use comment::Comment;
pub use post::Post;
pub use query::{ListParams, ListQuery, SortOrder};
pub use repository::OwnedRepository;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::validation::Schema;

/// A document type whose every instance belongs to exactly one author.
pub trait OwnedResource: Send + Sync + 'static {
    /// Stored and returned shape of one document.
    type Record: DeserializeOwned + Serialize + Send + Sync + 'static;

    /// Table the documents live in.
    const TABLE: &'static str;
    /// Route for create and list, e.g. `/posts`.
    const COLLECTION_PATH: &'static str;
    /// Route for a single document, e.g. `/posts/{id}`.
    const ITEM_PATH: &'static str;
    /// Stored fields selected alongside the id.
    const FIELDS: &'static str;
    /// Validation rules for create and patch payloads.
    const SCHEMA: Schema;
    /// Fields a patch may touch.
    const UPDATABLE: &'static [&'static str];
    /// `(client name, stored column)` pairs accepted by `sortBy`.
    const SORTABLE: &'static [(&'static str, &'static str)];
}

/// Tables whose documents are removed when their owner is deleted.
pub const OWNED_TABLES: [&str; 2] = [Post::TABLE, Comment::TABLE];
