//! NewType wrappers for identifiers that cross module boundaries.
//!
//! These keep an author id from being passed where a post/comment id is
//! expected, which matters because both are opaque strings on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Identifier of an author record (the key part, without the table name).
    ///
    /// This is the value embedded in the `sub` claim of session tokens and
    /// stored as `owner` on every post and comment.
    AuthorId
);

newtype_string!(
    /// Identifier of an owned document (post or comment).
    DocumentId
);

newtype_string!(
    /// Short SHA-256 fingerprint of a session token, safe to log.
    TokenFingerprint
);

/// Generate a fresh random record key.
///
/// Keys are plain lowercase hex so they never need escaping inside
/// `type::thing()` and are safe to put in URL paths.
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
