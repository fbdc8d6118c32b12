//! Ledger entry (transaction) domain model.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of balance-affecting event a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Money coming into an account from outside the ledger
    Deposit,
    /// Money leaving an account to outside the ledger
    Withdrawal,
    /// Credit leg of an internal transfer
    TransferIn,
    /// Debit leg of an internal transfer
    TransferOut,
    /// Fee charged on top of a transfer
    Fee,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::TransferIn => "TRANSFER_IN",
            Self::TransferOut => "TRANSFER_OUT",
            Self::Fee => "FEE",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "TRANSFER_IN" => Ok(Self::TransferIn),
            "TRANSFER_OUT" => Ok(Self::TransferOut),
            "FEE" => Ok(Self::Fee),
            _ => Err(DomainError::ValidationError(format!(
                "unknown entry type: {s}"
            ))),
        }
    }
}

/// Posting status of a ledger entry.
///
/// Normal operation only ever writes `Completed` entries; an append-only
/// ledger corrects itself with reversal entries, not updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Completed,
    Reversed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Reversed => "REVERSED",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "REVERSED" => Ok(Self::Reversed),
            _ => Err(DomainError::ValidationError(format!(
                "unknown entry status: {s}"
            ))),
        }
    }
}

const REFERENCE_LEN: usize = 12;
// No 0/O/1/I/L: reference numbers are read over the phone.
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Short opaque token identifying a transaction for external display and
/// reconciliation. Unique per transaction; uniqueness is enforced by the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Generates a reference token from the injected random source.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let token: String = (0..REFERENCE_LEN)
            .map(|_| char::from(REFERENCE_ALPHABET[rng.random_range(0..REFERENCE_ALPHABET.len())]))
            .collect();
        Self(token)
    }

    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "reference number cannot be empty".into(),
            ));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable record of a single balance-affecting event on one account.
///
/// Transactions are the append-only audit trail: they are created once and
/// never updated or deleted. Account balances are a projection that must
/// stay consistent with the sum of applied transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// The single account this entry belongs to
    pub account_id: AccountId,
    pub entry_type: EntryType,
    /// Positive magnitude of the movement
    pub amount: Money,
    /// Account balance immediately after this entry was applied
    pub balance_after: Money,
    pub description: String,
    /// External display/reconciliation token
    pub reference: ReferenceNumber,
    pub status: EntryStatus,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    /// Records a completed ledger entry.
    pub fn record(
        account_id: AccountId,
        entry_type: EntryType,
        amount: Money,
        balance_after: Money,
        description: String,
        reference: ReferenceNumber,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            entry_type,
            amount,
            balance_after,
            description,
            reference,
            status: EntryStatus::Completed,
            executed_at: Utc::now(),
        }
    }

    /// Reconstructs a transaction from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Money,
        balance_after: Money,
        description: String,
        reference: ReferenceNumber,
        status: EntryStatus,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            entry_type,
            amount,
            balance_after,
            description,
            reference,
            status,
            executed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Currency;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;

    #[test]
    fn test_record_is_completed() {
        let usd = Currency::new("USD").unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let tx = Transaction::record(
            AccountId::new(),
            EntryType::Deposit,
            Money::new(Decimal::new(10_00, 2), usd).unwrap(),
            Money::new(Decimal::new(10_00, 2), usd).unwrap(),
            "opening deposit".to_string(),
            ReferenceNumber::generate(&mut rng),
        );
        assert_eq!(tx.status, EntryStatus::Completed);
        assert_eq!(tx.entry_type, EntryType::Deposit);
    }

    #[test]
    fn test_reference_generation() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = ReferenceNumber::generate(&mut rng);
        let b = ReferenceNumber::generate(&mut rng);
        assert_eq!(a.as_str().len(), REFERENCE_LEN);
        assert_ne!(a, b);
        assert!(a.as_str().bytes().all(|c| REFERENCE_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_entry_type_round_trip() {
        for t in [
            EntryType::Deposit,
            EntryType::Withdrawal,
            EntryType::TransferIn,
            EntryType::TransferOut,
            EntryType::Fee,
        ] {
            assert_eq!(t.as_str().parse::<EntryType>().unwrap(), t);
        }
    }
}
