//! In-memory storage implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BlockListItem, Storage, StorageError, User};

/// In-memory [`Storage`] implementation.
///
/// Suitable for single-node deployments and tests. Block-list entries
/// are keyed by owner; the inherent mutators cover the write paths a
/// blocking-command front end needs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    users: RwLock<HashMap<String, User>>,
    block_lists: RwLock<HashMap<String, Vec<BlockListItem>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block-list entry for a user.
    pub fn insert_block_list_item(&self, item: BlockListItem) {
        self.block_lists
            .write()
            .entry(item.username.clone())
            .or_default()
            .push(item);
    }

    /// Remove all block-list entries owned by a user.
    pub fn delete_block_list_items(&self, username: &str) {
        self.block_lists.write().remove(username);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn user_exists(&self, username: &str) -> Result<bool, StorageError> {
        Ok(self.users.read().contains_key(username))
    }

    async fn insert_or_update_user(&self, user: User) -> Result<(), StorageError> {
        self.users.write().insert(user.username.clone(), user);
        Ok(())
    }

    async fn fetch_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn delete_user(&self, username: &str) -> Result<(), StorageError> {
        self.users.write().remove(username);
        Ok(())
    }

    async fn fetch_block_list_items(
        &self,
        username: &str,
    ) -> Result<Vec<BlockListItem>, StorageError> {
        Ok(self
            .block_lists
            .read()
            .get(username)
            .cloned()
            .unwrap_or_default())
    }
}
