//! Store port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (SQLite, in-memory) implement this trait.

use crate::domain::{
    Account, AccountId, IdempotencyKey, Transaction, TransactionId, Transfer, TransferId,
};
use crate::error::StoreError;

/// One unit of work produced by the domain layer, persisted all-or-nothing:
/// the mutated account snapshots, the new ledger entries, and the optional
/// transfer linking them.
#[derive(Debug, Clone, Default)]
pub struct CommitBundle {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub transfer: Option<Transfer>,
}

/// The main store port for ledger operations.
///
/// `commit` MUST be atomic. Implementations use a database transaction (or
/// an equivalent single critical section) so a failure at any step leaves
/// durable state unchanged.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a newly opened account. Fails with `ConstraintViolation` if
    /// the account number is already taken; callers regenerate and retry.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Gets an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Lists all accounts.
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Loads an account snapshot for mutation within the current unit of
    /// work. Fails with `AccountNotFound` if absent.
    ///
    /// Exclusivity is enforced when the mutated snapshot is committed: a
    /// concurrent commit to the same account makes this snapshot stale and
    /// `commit` rejects it, so interleaved debit/credit sequences can never
    /// both land.
    async fn load_for_update(&self, id: AccountId) -> Result<Account, StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Unit of Work (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Commits a unit of work as a single all-or-nothing operation.
    ///
    /// Fails with `DuplicateIdempotencyKey` when the bundle's transfer
    /// carries a key that is already recorded (the caller lost a race and
    /// should fetch the winner's transfer), and with `ConstraintViolation`
    /// on a stale account snapshot or duplicate reference number.
    async fn commit(&self, bundle: CommitBundle) -> Result<(), StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Idempotency & History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Finds a transfer by its idempotency key.
    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Transfer>, StoreError>;

    /// Gets a transfer by ID.
    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError>;

    /// Gets a ledger entry by ID.
    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Lists ledger entries for an account, newest first.
    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError>;
}
