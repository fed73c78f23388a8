//! crates/docuhub_core/src/ports.rs
//!
//! Defines the storage and hashing contracts (traits) for the portal's core logic.
//! These traits form the boundary of the hexagonal architecture: the repositories
//! hold the per-entity policies, the adapters behind these traits only persist.
//!
//! Every method is one atomic step against the backing medium. Adapters must not
//! split a call into an unguarded read-modify-write.

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{Account, AccountPatch, AccountProfile, Document};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage medium.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Login id already exists: {0}")]
    DuplicateId(String),
    #[error("Account {0} is protected and cannot be deleted")]
    Protected(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("A session is already active for {0}")]
    SessionActive(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Result of an insert that refuses to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores the document unless one with the same `(owner_id, original_filename)`
    /// already exists. Never overwrites.
    async fn insert_document_if_absent(&self, document: Document) -> PortResult<InsertOutcome>;

    /// All documents, newest `uploaded_at` first; ties keep the later insert first.
    async fn list_documents(&self) -> PortResult<Vec<Document>>;

    /// Same ordering as `list_documents`, restricted to an exact owner id.
    async fn list_documents_for_owner(&self, owner_id: &str) -> PortResult<Vec<Document>>;

    async fn get_document(&self, id: Uuid) -> PortResult<Option<Document>>;

    /// Returns whether a document was removed.
    async fn delete_document(&self, id: Uuid) -> PortResult<bool>;

    /// Returns the new count, or `None` when the id is unknown.
    async fn increment_view_count(&self, id: Uuid) -> PortResult<Option<u64>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn count_accounts(&self) -> PortResult<usize>;

    async fn get_account(&self, login_id: &str) -> PortResult<Option<Account>>;

    /// Stores the account unless the login id is taken. Never overwrites.
    async fn insert_account(&self, account: Account) -> PortResult<InsertOutcome>;

    /// Replaces the account with the same login id, or appends it.
    async fn upsert_account(&self, account: Account) -> PortResult<()>;

    /// Merges the patch into the stored account; `None` when the id is unknown.
    async fn update_account(&self, login_id: &str, patch: AccountPatch) -> PortResult<Option<Account>>;

    /// Returns whether an account was removed.
    async fn delete_account(&self, login_id: &str) -> PortResult<bool>;

    /// All accounts in insertion order.
    async fn list_accounts(&self) -> PortResult<Vec<Account>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(&self) -> PortResult<Option<AccountProfile>>;

    async fn save_session(&self, profile: &AccountProfile) -> PortResult<()>;

    async fn clear_session(&self) -> PortResult<()>;
}

/// Opaque key/value settings owned by the presentation layer (language, theme).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_preference(&self, key: &str, value: &str) -> PortResult<()>;
}

//=========================================================================================
// Hashing Port
//=========================================================================================

pub trait SecretHasher: Send + Sync {
    /// Produces a salted, self-describing hash string.
    fn hash_secret(&self, secret: &str) -> PortResult<String>;

    /// Checks a clear-text secret against a hash produced by `hash_secret`.
    fn verify_secret(&self, secret: &str, hash: &str) -> PortResult<bool>;
}
