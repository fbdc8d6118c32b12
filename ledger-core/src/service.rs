//! Ledger application service.
//!
//! Orchestrates domain operations through the store port. Contains NO
//! storage logic - it runs the boundary protocol the domain algorithm
//! depends on: idempotency lookup before execution, canonical account load
//! order, one atomic commit per operation.

use std::sync::Mutex;

use rand::Rng;
use rust_decimal::Decimal;

use ledger_types::{
    Account, AccountId, AccountNumber, AccountType, CommitBundle, Currency, CustomerId,
    DomainError, IdempotencyKey, LedgerStore, Money, StoreError, Transaction, Transfer,
    TransferCategory, TransferId, TransferPlan, TransferService,
};

/// Attempts at allocating a unique account number before giving up.
const NUMBER_ALLOCATION_ATTEMPTS: usize = 5;

/// Default per-account transfer limits, in minor units.
const DEFAULT_DAILY_LIMIT: i64 = 10_000_00;
const DEFAULT_MONTHLY_LIMIT: i64 = 50_000_00;

/// Request to open a new account.
#[derive(Debug, Clone)]
pub struct OpenAccountCommand {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub currency: Currency,
    /// Display alias; generated when not provided.
    pub alias: Option<String>,
}

/// Request to deposit money into an account.
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub account_id: AccountId,
    pub amount: Money,
    pub description: String,
}

/// Request to withdraw money from an account.
#[derive(Debug, Clone)]
pub struct WithdrawCommand {
    pub account_id: AccountId,
    pub amount: Money,
    pub description: String,
}

/// Request to transfer money between two accounts.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub category: TransferCategory,
    pub amount: Money,
    pub fee_amount: Option<Money>,
    pub description: String,
    pub idempotency_key: IdempotencyKey,
}

/// Outcome of a transfer request.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transfer: Transfer,
    /// True when the result was recorded by a previous request with the
    /// same idempotency key; no new money moved on this call.
    pub replayed: bool,
}

/// Application service for ledger operations.
///
/// Generic over `S: LedgerStore` - the adapter is injected at compile time,
/// so adapters swap without code changes and tests run against the
/// in-memory store. The random source is injected too, so account-number
/// and reference generation is deterministic under a seeded generator.
pub struct LedgerService<S: LedgerStore, R: Rng> {
    store: S,
    rng: Mutex<R>,
}

impl<S, R> LedgerService<S, R>
where
    S: LedgerStore,
    R: Rng,
{
    /// Creates a new ledger service with the given store and random source.
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a new account with a generated, checksum-validated number.
    ///
    /// Number uniqueness is a store constraint; on a collision a fresh
    /// number is generated and the insert retried.
    #[tracing::instrument(skip(self, cmd), fields(customer_id = %cmd.customer_id))]
    pub async fn open_account(&self, cmd: OpenAccountCommand) -> Result<Account, StoreError> {
        let daily = Money::new(Decimal::new(DEFAULT_DAILY_LIMIT, 2), cmd.currency)?;
        let monthly = Money::new(Decimal::new(DEFAULT_MONTHLY_LIMIT, 2), cmd.currency)?;

        let mut last_collision = None;
        for _ in 0..NUMBER_ALLOCATION_ATTEMPTS {
            let (number, alias) = {
                let mut rng = self.rng.lock().expect("rng lock poisoned");
                let number = AccountNumber::generate(cmd.account_type, &mut *rng);
                let alias = cmd
                    .alias
                    .clone()
                    .unwrap_or_else(|| default_alias(cmd.account_type, &mut *rng));
                (number, alias)
            };
            let account = Account::open(
                cmd.customer_id,
                number,
                alias,
                cmd.account_type,
                cmd.currency,
                daily,
                monthly,
            )?;

            match self.store.insert_account(&account).await {
                Ok(()) => return Ok(account),
                Err(StoreError::ConstraintViolation(msg)) => {
                    last_collision = Some(msg);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::ConstraintViolation(last_collision.unwrap_or_else(
            || "account number allocation failed".to_string(),
        )))
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }

    /// Lists all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.store.list_accounts().await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Money Movement
    // ─────────────────────────────────────────────────────────────────────────────

    /// Deposits money into an account.
    #[tracing::instrument(skip(self, cmd), fields(account_id = %cmd.account_id, amount = %cmd.amount))]
    pub async fn deposit(&self, cmd: DepositCommand) -> Result<Transaction, StoreError> {
        let mut account = self.store.load_for_update(cmd.account_id).await?;
        let entry = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            TransferService::execute_deposit(&mut account, cmd.amount, cmd.description, &mut *rng)
        }?;
        self.store
            .commit(CommitBundle {
                accounts: vec![account],
                transactions: vec![entry.clone()],
                transfer: None,
            })
            .await?;
        Ok(entry)
    }

    /// Withdraws money from an account.
    #[tracing::instrument(skip(self, cmd), fields(account_id = %cmd.account_id, amount = %cmd.amount))]
    pub async fn withdraw(&self, cmd: WithdrawCommand) -> Result<Transaction, StoreError> {
        let mut account = self.store.load_for_update(cmd.account_id).await?;
        let entry = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            TransferService::execute_withdrawal(
                &mut account,
                cmd.amount,
                cmd.description,
                &mut *rng,
            )
        }?;
        self.store
            .commit(CommitBundle {
                accounts: vec![account],
                transactions: vec![entry.clone()],
                transfer: None,
            })
            .await?;
        Ok(entry)
    }

    /// Transfers money between two accounts, exactly once per idempotency
    /// key.
    ///
    /// A request replayed with a known key returns the recorded transfer
    /// without moving money again. When two identical requests race, the
    /// store's unique key constraint lets one commit; the loser fetches and
    /// returns the winner's transfer.
    #[tracing::instrument(
        skip(self, cmd),
        fields(source = %cmd.source_account_id, target = %cmd.target_account_id, amount = %cmd.amount)
    )]
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<TransferReceipt, StoreError> {
        if let Some(existing) = self.store.find_transfer_by_key(&cmd.idempotency_key).await? {
            return Ok(TransferReceipt {
                transfer: existing,
                replayed: true,
            });
        }
        if cmd.source_account_id == cmd.target_account_id {
            return Err(DomainError::SameAccountTransfer(cmd.source_account_id).into());
        }

        // Canonical load order - lower account id first - so two transfers
        // moving money between the same pair in opposite directions cannot
        // deadlock the storage layer.
        let (mut source, mut target) = if cmd.source_account_id < cmd.target_account_id {
            let source = self.store.load_for_update(cmd.source_account_id).await?;
            let target = self.store.load_for_update(cmd.target_account_id).await?;
            (source, target)
        } else {
            let target = self.store.load_for_update(cmd.target_account_id).await?;
            let source = self.store.load_for_update(cmd.source_account_id).await?;
            (source, target)
        };

        let plan = TransferPlan {
            category: cmd.category,
            amount: cmd.amount,
            fee_amount: cmd.fee_amount,
            description: cmd.description,
            idempotency_key: cmd.idempotency_key,
        };
        let records = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            TransferService::execute_transfer(&mut source, &mut target, plan, &mut *rng)
        }?;

        let mut transactions = vec![records.debit.clone()];
        if let Some(fee) = &records.fee {
            transactions.push(fee.clone());
        }
        transactions.push(records.credit.clone());

        let bundle = CommitBundle {
            accounts: vec![source, target],
            transactions,
            transfer: Some(records.transfer.clone()),
        };

        match self.store.commit(bundle).await {
            Ok(()) => Ok(TransferReceipt {
                transfer: records.transfer,
                replayed: false,
            }),
            Err(StoreError::Domain(DomainError::DuplicateIdempotencyKey(key))) => {
                // Lost the race: the winner's bundle is already durable.
                match self.store.find_transfer_by_key(&key).await? {
                    Some(transfer) => Ok(TransferReceipt {
                        transfer,
                        replayed: true,
                    }),
                    None => Err(DomainError::DuplicateIdempotencyKey(key).into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a transfer by ID.
    pub async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        self.store.get_transfer(id).await
    }

    /// Lists ledger entries for an account, newest first.
    pub async fn account_history(&self, id: AccountId) -> Result<Vec<Transaction>, StoreError> {
        // Verify the account exists first
        let _ = self.get_account(id).await?;
        self.store.list_transactions_for_account(id).await
    }
}

fn default_alias<R: Rng>(account_type: AccountType, rng: &mut R) -> String {
    format!(
        "{}-{:04}",
        account_type.as_str().to_ascii_lowercase().replace('_', "-"),
        rng.random_range(0..10_000u16)
    )
}
