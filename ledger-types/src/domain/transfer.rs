//! Transfer aggregate linking the ledger entries of one money movement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::money::Money;
use super::transaction::TransactionId;
use crate::error::DomainError;

/// Unique identifier for a Transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Creates a new random TransferId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransferId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Caller-supplied token making a repeated transfer request produce one
/// effect, not many. Unique across all transfers (store constraint).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "idempotency key cannot be empty".into(),
            ));
        }
        if key.len() > 128 {
            return Err(DomainError::ValidationError(
                "idempotency key longer than 128 bytes".into(),
            ));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business category of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferCategory {
    /// Between two accounts held at this bank
    Internal,
    /// One leg settles outside this ledger
    External,
}

impl TransferCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::External => "EXTERNAL",
        }
    }
}

impl std::fmt::Display for TransferCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransferCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTERNAL" => Ok(Self::Internal),
            "EXTERNAL" => Ok(Self::External),
            _ => Err(DomainError::ValidationError(format!(
                "unknown transfer category: {s}"
            ))),
        }
    }
}

/// One logical money movement: a debit entry, a credit entry, and an
/// optional fee entry, recorded as a single business event.
///
/// Transfers are immutable after creation and reference their ledger
/// entries by id only - no live object graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier
    pub id: TransferId,
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub category: TransferCategory,
    /// Principal amount moved from source to target
    pub amount: Money,
    /// Fee charged to the source account, if any
    pub fee_amount: Option<Money>,
    pub description: String,
    pub debit_transaction_id: TransactionId,
    pub credit_transaction_id: TransactionId,
    pub fee_transaction_id: Option<TransactionId>,
    pub idempotency_key: IdempotencyKey,
    pub executed_at: DateTime<Utc>,
}

impl Transfer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_account_id: AccountId,
        target_account_id: AccountId,
        category: TransferCategory,
        amount: Money,
        fee_amount: Option<Money>,
        description: String,
        debit_transaction_id: TransactionId,
        credit_transaction_id: TransactionId,
        fee_transaction_id: Option<TransactionId>,
        idempotency_key: IdempotencyKey,
    ) -> Self {
        Self {
            id: TransferId::new(),
            source_account_id,
            target_account_id,
            category,
            amount,
            fee_amount,
            description,
            debit_transaction_id,
            credit_transaction_id,
            fee_transaction_id,
            idempotency_key,
            executed_at: Utc::now(),
        }
    }

    /// Reconstructs a transfer from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransferId,
        source_account_id: AccountId,
        target_account_id: AccountId,
        category: TransferCategory,
        amount: Money,
        fee_amount: Option<Money>,
        description: String,
        debit_transaction_id: TransactionId,
        credit_transaction_id: TransactionId,
        fee_transaction_id: Option<TransactionId>,
        idempotency_key: IdempotencyKey,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source_account_id,
            target_account_id,
            category,
            amount,
            fee_amount,
            description,
            debit_transaction_id,
            credit_transaction_id,
            fee_transaction_id,
            idempotency_key,
            executed_at,
        }
    }
}
