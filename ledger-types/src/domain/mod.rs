//! Domain models for the ledger service.

pub mod account;
pub mod account_number;
pub mod money;
pub mod service;
pub mod transaction;
pub mod transfer;

pub use account::{Account, AccountId, AccountStatus, AccountType, CustomerId};
pub use account_number::AccountNumber;
pub use money::{Currency, Money};
pub use service::{TransferPlan, TransferRecords, TransferService};
pub use transaction::{EntryStatus, EntryType, ReferenceNumber, Transaction, TransactionId};
pub use transfer::{IdempotencyKey, Transfer, TransferCategory, TransferId};
