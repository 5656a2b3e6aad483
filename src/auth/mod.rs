//! Authentication and identity.
//!
//! - **Credential store**: author records, bcrypt password hashes and the
//!   list of active session tokens each author holds.
//! - **Token service**: signs and verifies HS256 session tokens and keeps the
//!   active list in sync on login and logout.
//! - **Gate**: turns an `Authorization: Bearer <token>` header into an
//!   [`AuthContext`], or a 401.
//!
//! ## Security Model
//!
//! - A token is accepted only if its signature and expiry verify AND it is
//!   still present in its author's active list
//! - Login failures never reveal whether the e-mail address exists
//! - Password hashes and tokens are never serialized to clients or logged

mod context;
pub mod credentials;
mod extractor;
pub mod token;

pub use context::AuthContext;
pub use credentials::{AUTHOR_SCHEMA, AUTHOR_UPDATABLE, CredentialStore};
pub use extractor::{AuthError, AuthGate};
pub use token::{TokenClaims, TokenService, token_fingerprint};
