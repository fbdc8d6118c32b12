//! Error types for the ledger core.

use crate::domain::{AccountId, AccountStatus, Currency, IdempotencyKey, Money};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("account {account_id} is not active (status {status})")]
    AccountNotActive {
        account_id: AccountId,
        status: AccountStatus,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("source and target accounts are the same: {0}")]
    SameAccountTransfer(AccountId),

    #[error("transfer of {requested} exceeds the daily limit of {limit}")]
    TransferLimitExceeded { requested: Money, limit: Money },

    #[error("duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(IdempotencyKey),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("invalid account number: {0}")]
    InvalidAccountNumber(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Store-level errors (data access failures).
///
/// Domain errors raised below the store boundary propagate unchanged
/// through the transparent variant.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}
