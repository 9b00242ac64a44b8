use thiserror::Error;

/// Failure talking to the backing store. "Name not present" is never an
/// error; adapters report it as an empty value.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unreachable: {0}")]
    Transport(String),
    #[error("malformed storage response: {0}")]
    Response(String),
}
