//! Database module for journal persistence.
//!
//! This module provides:
//! - The `JournalStore` abstraction the engine writes through
//! - Database initialization, pragmas and migrations
//! - The SQLite repository and an in-memory store

pub mod memory;
pub mod migrations;
pub mod repo;
pub mod store;

pub use memory::MemoryStore;
pub use migrations::init_db;
pub use repo::Repository;
pub use store::{
    CsvWriteOutcome, EmptyDayPolicy, ImportRecord, JournalStore, PasteWriteOutcome, StoreError,
};
