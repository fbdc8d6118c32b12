//! SQLite store adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use ledger_types::{
    Account, AccountId, CommitBundle, DomainError, IdempotencyKey, LedgerStore, StoreError,
    Transaction, TransactionId, Transfer, TransferId,
};

use crate::types::{DbAccount, DbTransaction, DbTransfer};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite store implementation.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to the database and applies the schema migration.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Each pooled connection to a :memory: database sees its own
        // database; cap the pool so there is exactly one.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        tracing::debug!("applying ledger schema migration");
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::raw_sql(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Maps a unique-constraint failure to `ConstraintViolation`, everything
/// else to `Database`.
fn constraint_or_db(e: sqlx::Error) -> StoreError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            StoreError::ConstraintViolation(db.message().to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO accounts
               (id, customer_id, account_number, alias, account_type, currency, status,
                balance, available_balance, daily_transfer_limit, monthly_transfer_limit,
                version, opened_at, closed_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(account.id.to_string())
        .bind(account.customer_id.to_string())
        .bind(account.account_number.as_str())
        .bind(&account.alias)
        .bind(account.account_type.as_str())
        .bind(account.currency.as_str())
        .bind(account.status.as_str())
        .bind(account.balance.amount().to_string())
        .bind(account.available_balance.amount().to_string())
        .bind(account.daily_transfer_limit.amount().to_string())
        .bind(account.monthly_transfer_limit.amount().to_string())
        .bind(account.version as i64)
        .bind(account.opened_at.to_rfc3339())
        .bind(account.closed_at.map(|t| t.to_rfc3339()))
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(constraint_or_db)?;

        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, customer_id, account_number, alias, account_type, currency, status,
                      balance, available_balance, daily_transfer_limit, monthly_transfer_limit,
                      version, opened_at, closed_at, updated_at
               FROM accounts WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<DbAccount> = sqlx::query_as(
            r#"SELECT id, customer_id, account_number, alias, account_type, currency, status,
                      balance, available_balance, daily_transfer_limit, monthly_transfer_limit,
                      version, opened_at, closed_at, updated_at
               FROM accounts ORDER BY opened_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbAccount::into_domain).collect()
    }

    async fn load_for_update(&self, id: AccountId) -> Result<Account, StoreError> {
        self.get_account(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }

    async fn commit(&self, bundle: CommitBundle) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for account in &bundle.accounts {
            // CAS on the version loaded with the snapshot: a concurrent
            // commit makes this snapshot stale and the update matches no row.
            let result = sqlx::query(
                r#"UPDATE accounts
                   SET status = ?, balance = ?, available_balance = ?,
                       closed_at = ?, updated_at = ?, version = version + 1
                   WHERE id = ? AND version = ?"#,
            )
            .bind(account.status.as_str())
            .bind(account.balance.amount().to_string())
            .bind(account.available_balance.amount().to_string())
            .bind(account.closed_at.map(|t| t.to_rfc3339()))
            .bind(account.updated_at.to_rfc3339())
            .bind(account.id.to_string())
            .bind(account.version as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::ConstraintViolation(format!(
                    "stale snapshot for account {}",
                    account.id
                )));
            }
        }

        for entry in &bundle.transactions {
            sqlx::query(
                r#"INSERT INTO transactions
                   (id, account_id, entry_type, amount, currency, balance_after,
                    description, reference, status, executed_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(entry.id.to_string())
            .bind(entry.account_id.to_string())
            .bind(entry.entry_type.as_str())
            .bind(entry.amount.amount().to_string())
            .bind(entry.amount.currency().to_string())
            .bind(entry.balance_after.amount().to_string())
            .bind(&entry.description)
            .bind(entry.reference.as_str())
            .bind(entry.status.as_str())
            .bind(entry.executed_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(constraint_or_db)?;
        }

        if let Some(transfer) = &bundle.transfer {
            sqlx::query(
                r#"INSERT INTO transfers
                   (id, source_account_id, target_account_id, category, amount, currency,
                    fee_amount, description, debit_transaction_id, credit_transaction_id,
                    fee_transaction_id, idempotency_key, executed_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(transfer.id.to_string())
            .bind(transfer.source_account_id.to_string())
            .bind(transfer.target_account_id.to_string())
            .bind(transfer.category.as_str())
            .bind(transfer.amount.amount().to_string())
            .bind(transfer.amount.currency().to_string())
            .bind(transfer.fee_amount.map(|m| m.amount().to_string()))
            .bind(&transfer.description)
            .bind(transfer.debit_transaction_id.to_string())
            .bind(transfer.credit_transaction_id.to_string())
            .bind(transfer.fee_transaction_id.map(|id| id.to_string()))
            .bind(transfer.idempotency_key.as_str())
            .bind(transfer.executed_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() && db.message().contains("idempotency_key") => {
                    DomainError::DuplicateIdempotencyKey(transfer.idempotency_key.clone()).into()
                }
                _ => constraint_or_db(e),
            })?;
        }

        // Dropping the transaction without committing rolls everything back.
        tx.commit().await.map_err(db_err)
    }

    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Transfer>, StoreError> {
        let row: Option<DbTransfer> = sqlx::query_as(
            r#"SELECT id, source_account_id, target_account_id, category, amount, currency,
                      fee_amount, description, debit_transaction_id, credit_transaction_id,
                      fee_transaction_id, idempotency_key, executed_at
               FROM transfers WHERE idempotency_key = ?"#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransfer::into_domain).transpose()
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        let row: Option<DbTransfer> = sqlx::query_as(
            r#"SELECT id, source_account_id, target_account_id, category, amount, currency,
                      fee_amount, description, debit_transaction_id, credit_transaction_id,
                      fee_transaction_id, idempotency_key, executed_at
               FROM transfers WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransfer::into_domain).transpose()
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, entry_type, amount, currency, balance_after,
                      description, reference, status, executed_at
               FROM transactions WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, entry_type, amount, currency, balance_after,
                      description, reference, status, executed_at
               FROM transactions WHERE account_id = ?
               ORDER BY executed_at DESC"#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }
}
