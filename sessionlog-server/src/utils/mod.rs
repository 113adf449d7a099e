//! Utility modules for sessionlog-server

pub mod db_retry;
pub mod key_locks;

pub use db_retry::retry_on_lock;
pub use key_locks::KeyedLocks;
