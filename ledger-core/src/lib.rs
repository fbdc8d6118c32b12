//! # Ledger Core
//!
//! Application service for the ledger. Orchestrates the pure domain
//! algorithm through the store port - idempotency lookup, canonical load
//! order, atomic commit - and contains no storage or transport logic.

mod service;

pub use service::{
    DepositCommand, LedgerService, OpenAccountCommand, TransferCommand, TransferReceipt,
    WithdrawCommand,
};
