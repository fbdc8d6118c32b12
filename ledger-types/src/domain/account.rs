//! Account aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account_number::AccountNumber;
use super::money::{Currency, Money};
use crate::error::DomainError;

/// Unique identifier for an Account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random AccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AccountId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for the customer owning an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new random CustomerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a CustomerId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Frozen => "FROZEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "FROZEN" => Ok(Self::Frozen),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(DomainError::ValidationError(format!(
                "unknown account status: {s}"
            ))),
        }
    }
}

/// Product type of an account. Determines the account number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    FixedDeposit,
}

impl AccountType {
    /// Two leading digits of account numbers of this type.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            Self::Checking => "10",
            Self::Savings => "20",
            Self::FixedDeposit => "30",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "CHECKING",
            Self::Savings => "SAVINGS",
            Self::FixedDeposit => "FIXED_DEPOSIT",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "CHECKING" => Ok(Self::Checking),
            "SAVINGS" => Ok(Self::Savings),
            "FIXED_DEPOSIT" => Ok(Self::FixedDeposit),
            _ => Err(DomainError::ValidationError(format!(
                "unknown account type: {s}"
            ))),
        }
    }
}

/// A customer account holding a balance in a single currency.
///
/// Balances are mutated only through `debit` and `credit`; identity fields
/// are assigned at opening and immutable afterwards. An account is closed
/// by status transition, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Checksum-validated external identifier
    pub account_number: AccountNumber,
    /// Human-readable account alias
    pub alias: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub status: AccountStatus,
    /// Booked balance
    pub balance: Money,
    /// Portion of the balance usable for new debits
    pub available_balance: Money,
    pub daily_transfer_limit: Money,
    pub monthly_transfer_limit: Money,
    /// Optimistic-concurrency token, managed by the store at commit time.
    pub version: u64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new active account with zero balances.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        customer_id: CustomerId,
        account_number: AccountNumber,
        alias: String,
        account_type: AccountType,
        currency: Currency,
        daily_transfer_limit: Money,
        monthly_transfer_limit: Money,
    ) -> Result<Self, DomainError> {
        if alias.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "account alias cannot be empty".into(),
            ));
        }
        for limit in [&daily_transfer_limit, &monthly_transfer_limit] {
            if limit.currency() != currency {
                return Err(DomainError::CurrencyMismatch {
                    expected: currency,
                    got: limit.currency(),
                });
            }
            if limit.is_negative() {
                return Err(DomainError::InvalidAmount(
                    "transfer limit cannot be negative".into(),
                ));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: AccountId::new(),
            customer_id,
            account_number,
            alias,
            account_type,
            currency,
            status: AccountStatus::Active,
            balance: Money::zero(currency),
            available_balance: Money::zero(currency),
            daily_transfer_limit,
            monthly_transfer_limit,
            version: 0,
            opened_at: now,
            closed_at: None,
            updated_at: now,
        })
    }

    fn ensure_mutable(&self, amount: &Money) -> Result<(), DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount(format!(
                "amount must be positive, got {amount}"
            )));
        }
        if self.status != AccountStatus::Active {
            return Err(DomainError::AccountNotActive {
                account_id: self.id,
                status: self.status,
            });
        }
        if amount.currency() != self.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: amount.currency(),
            });
        }
        Ok(())
    }

    /// Debits (subtracts) money from both balances.
    ///
    /// Validation happens before any field changes, so a failed debit
    /// leaves the account untouched and no partial update is observable.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.ensure_mutable(&amount)?;
        if amount.gt(&self.available_balance)? {
            return Err(DomainError::InsufficientFunds {
                available: self.available_balance,
                requested: amount,
            });
        }
        let balance = self.balance.checked_sub(amount)?;
        let available = self.available_balance.checked_sub(amount)?;
        self.balance = balance;
        self.available_balance = available;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Credits (adds) money to both balances.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.ensure_mutable(&amount)?;
        let balance = self.balance.checked_add(amount)?;
        let available = self.available_balance.checked_add(amount)?;
        self.balance = balance;
        self.available_balance = available;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Suspends all balance mutations on the account.
    pub fn freeze(&mut self) -> Result<(), DomainError> {
        if self.status != AccountStatus::Active {
            return Err(DomainError::AccountNotActive {
                account_id: self.id,
                status: self.status,
            });
        }
        self.status = AccountStatus::Frozen;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Lifts a freeze.
    pub fn unfreeze(&mut self) -> Result<(), DomainError> {
        if self.status != AccountStatus::Frozen {
            return Err(DomainError::ValidationError(format!(
                "account {} is not frozen",
                self.id
            )));
        }
        self.status = AccountStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Closes the account. Requires a zero balance; the record is kept.
    pub fn close(&mut self) -> Result<(), DomainError> {
        if self.status == AccountStatus::Closed {
            return Err(DomainError::ValidationError(format!(
                "account {} is already closed",
                self.id
            )));
        }
        if !self.balance.is_zero() {
            return Err(DomainError::ValidationError(
                "cannot close an account with a non-zero balance".into(),
            ));
        }
        let now = Utc::now();
        self.status = AccountStatus::Closed;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
