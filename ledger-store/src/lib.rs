//! # Ledger Store
//!
//! Concrete store implementations (adapters) for the ledger service.
//! This crate provides the adapters that implement the `LedgerStore` port:
//! a durable SQLite adapter and an in-memory adapter with the same commit
//! semantics.

pub mod memory;
pub mod sqlite;

mod types;

#[cfg(test)]
mod sqlite_tests;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
