//! Persistence boundary for user accounts and block lists.
//!
//! The registry and the registration module consume storage through
//! the [`Storage`] trait; implementations can be backed by a database
//! or, for single-node deployments and tests, kept in memory.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use thiserror::Error;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account local part.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// A persisted block-list entry.
///
/// The JID is kept as the string the client submitted; the router
/// parses it on load and skips entries that fail to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockListItem {
    /// Owner of the block-list entry.
    pub username: String,
    /// Blocked JID pattern.
    pub jid: String,
}

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend is unreachable or failed mid-operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend returned malformed data.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    /// Internal error.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Persistent storage consumed by the session registry.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether an account with the given username exists.
    async fn user_exists(&self, username: &str) -> Result<bool, StorageError>;

    /// Create or update a user account.
    async fn insert_or_update_user(&self, user: User) -> Result<(), StorageError>;

    /// Fetch a user account, or `None` if it does not exist.
    async fn fetch_user(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Delete a user account.
    async fn delete_user(&self, username: &str) -> Result<(), StorageError>;

    /// Fetch all block-list entries owned by a user.
    async fn fetch_block_list_items(
        &self,
        username: &str,
    ) -> Result<Vec<BlockListItem>, StorageError>;
}
