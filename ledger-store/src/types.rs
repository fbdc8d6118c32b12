//! Database row structs and domain conversions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;

use ledger_types::{
    Account, AccountId, AccountNumber, Currency, CustomerId, IdempotencyKey, Money,
    ReferenceNumber, StoreError, Transaction, TransactionId, Transfer, TransferId,
};

fn bad(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(s).map_err(bad)
}

fn parse_money(amount: &str, currency: Currency) -> Result<Money, StoreError> {
    let amount = Decimal::from_str(amount).map_err(bad)?;
    Money::new(amount, currency).map_err(StoreError::Domain)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(bad)
}

/// Account row from the database.
#[derive(FromRow)]
pub struct DbAccount {
    pub id: String,
    pub customer_id: String,
    pub account_number: String,
    pub alias: String,
    pub account_type: String,
    pub currency: String,
    pub status: String,
    pub balance: String,
    pub available_balance: String,
    pub daily_transfer_limit: String,
    pub monthly_transfer_limit: String,
    pub version: i64,
    pub opened_at: String,
    pub closed_at: Option<String>,
    pub updated_at: String,
}

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, StoreError> {
        let currency = Currency::new(&self.currency).map_err(StoreError::Domain)?;
        Ok(Account {
            id: AccountId::from_uuid(parse_uuid(&self.id)?),
            customer_id: CustomerId::from_uuid(parse_uuid(&self.customer_id)?),
            account_number: AccountNumber::parse(&self.account_number)
                .map_err(StoreError::Domain)?,
            alias: self.alias,
            account_type: self.account_type.parse().map_err(StoreError::Domain)?,
            currency,
            status: self.status.parse().map_err(StoreError::Domain)?,
            balance: parse_money(&self.balance, currency)?,
            available_balance: parse_money(&self.available_balance, currency)?,
            daily_transfer_limit: parse_money(&self.daily_transfer_limit, currency)?,
            monthly_transfer_limit: parse_money(&self.monthly_transfer_limit, currency)?,
            version: self.version as u64,
            opened_at: parse_datetime(&self.opened_at)?,
            closed_at: self.closed_at.as_deref().map(parse_datetime).transpose()?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Transaction row from the database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub account_id: String,
    pub entry_type: String,
    pub amount: String,
    pub currency: String,
    pub balance_after: String,
    pub description: String,
    pub reference: String,
    pub status: String,
    pub executed_at: String,
}

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, StoreError> {
        let currency = Currency::new(&self.currency).map_err(StoreError::Domain)?;
        Ok(Transaction::from_parts(
            TransactionId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.account_id)?),
            self.entry_type.parse().map_err(StoreError::Domain)?,
            parse_money(&self.amount, currency)?,
            parse_money(&self.balance_after, currency)?,
            self.description,
            ReferenceNumber::new(self.reference).map_err(StoreError::Domain)?,
            self.status.parse().map_err(StoreError::Domain)?,
            parse_datetime(&self.executed_at)?,
        ))
    }
}

/// Transfer row from the database.
#[derive(FromRow)]
pub struct DbTransfer {
    pub id: String,
    pub source_account_id: String,
    pub target_account_id: String,
    pub category: String,
    pub amount: String,
    pub currency: String,
    pub fee_amount: Option<String>,
    pub description: String,
    pub debit_transaction_id: String,
    pub credit_transaction_id: String,
    pub fee_transaction_id: Option<String>,
    pub idempotency_key: String,
    pub executed_at: String,
}

impl DbTransfer {
    /// Convert database row to domain Transfer.
    pub fn into_domain(self) -> Result<Transfer, StoreError> {
        let currency = Currency::new(&self.currency).map_err(StoreError::Domain)?;
        let fee_amount = self
            .fee_amount
            .as_deref()
            .map(|s| parse_money(s, currency))
            .transpose()?;
        let fee_transaction_id = self
            .fee_transaction_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(TransactionId::from_uuid);
        Ok(Transfer::from_parts(
            TransferId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.source_account_id)?),
            AccountId::from_uuid(parse_uuid(&self.target_account_id)?),
            self.category.parse().map_err(StoreError::Domain)?,
            parse_money(&self.amount, currency)?,
            fee_amount,
            self.description,
            TransactionId::from_uuid(parse_uuid(&self.debit_transaction_id)?),
            TransactionId::from_uuid(parse_uuid(&self.credit_transaction_id)?),
            fee_transaction_id,
            IdempotencyKey::new(self.idempotency_key).map_err(StoreError::Domain)?,
            parse_datetime(&self.executed_at)?,
        ))
    }
}
