//! Key-value storage collaborator
//!
//! The engine persists a single JSON-encoded record under a fixed key.
//! Backends only move strings around; encoding lives with the record types.

pub mod file_storage;
pub mod memory_storage;

pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;

use crate::error::PersistenceError;

/// Key holding the active `TimerRecord`
pub const TIMER_KEY: &str = "timerData";

/// Key holding the user `Settings`
pub const SETTINGS_KEY: &str = "settings";

/// String key-value store shared by the engine and the settings layer
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}
