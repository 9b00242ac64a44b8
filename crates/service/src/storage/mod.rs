//! Storage adapters for named text entries.
//!
//! The router only ever sees the `EntryStore` trait; which adapter backs it
//! is decided by configuration at process start.

pub mod datastore;
pub mod memory;

use async_trait::async_trait;

use crate::errors::StorageError;

pub use datastore::DatastoreStore;
pub use memory::MemoryStore;

/// Contract shared by all storage adapters.
///
/// One value per name; entries are created implicitly by `put` and never
/// deleted. A missing name is not an error: `get` returns an empty string.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All known entry names in ascending lexical order.
    async fn list(&self) -> Result<Vec<String>, StorageError>;
    /// The stored text for `name`, or `""` if the name was never put.
    async fn get(&self, name: &str) -> Result<String, StorageError>;
    /// Create or overwrite the entry for `name`.
    async fn put(&self, name: &str, value: &str) -> Result<(), StorageError>;
}
