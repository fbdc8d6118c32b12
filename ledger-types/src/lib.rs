//! # Ledger Types
//!
//! Domain types and the store port for the core banking ledger.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, Transaction, Transfer)
//!   and the money-movement algorithm
//! - `ports/` - Trait definitions that store adapters must implement
//! - `error/` - Domain and store error types

pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, AccountNumber, AccountStatus, AccountType, Currency, CustomerId,
    EntryStatus, EntryType, IdempotencyKey, Money, ReferenceNumber, Transaction, TransactionId,
    Transfer, TransferCategory, TransferId, TransferPlan, TransferRecords, TransferService,
};
pub use error::{DomainError, StoreError};
pub use ports::{CommitBundle, LedgerStore};
