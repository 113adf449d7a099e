//! Ingestion and aggregation services

pub mod aggregate_resolver;
pub mod aggregate_updater;
pub mod ingestion;
pub mod merge;

pub use aggregate_updater::{AggregateUpdate, AggregateUpdater, UpdateAction};
pub use ingestion::{IngestOutcome, IngestionService};
