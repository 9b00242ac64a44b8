//! Storage layer for the entry API.
//! - Defines the `EntryStore` contract consumed by the HTTP router.
//! - Ships two interchangeable adapters: remote Cloud Datastore and
//!   in-process memory.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod storage;

pub use errors::StorageError;
pub use storage::{DatastoreStore, EntryStore, MemoryStore};
