//! # Session Log Common Library
//!
//! Shared code for the session log services:
//! - Session log wire format (metadata block + event lines)
//! - Event classification into aggregate dimensions
//! - Database schema and models
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod dimension;
pub mod error;
pub mod format;
pub mod time;

pub use dimension::{AggregateKey, AggregateKind, Dimension, DimensionKey, DimensionValue};
pub use error::{Error, Result};
