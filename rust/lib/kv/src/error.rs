use thiserror::Error;

/// Errors raised by a [`KVStore`](crate::KVStore) backend.
#[derive(Error, Debug)]
pub enum KVError {
    /// Backend failed to open, read, or commit.
    #[error("storage error: {0}")]
    Storage(String),

    /// A writer panicked while holding the in-process store lock.
    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),
}
