//! In-memory store adapter.
//!
//! Backs the service-layer tests and ad-hoc runs. Commit semantics match
//! the durable adapter: the whole bundle is validated first, then applied
//! under a single lock, so a rejected commit changes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use ledger_types::{
    Account, AccountId, AccountNumber, CommitBundle, DomainError, IdempotencyKey, LedgerStore,
    ReferenceNumber, StoreError, Transaction, TransactionId, Transfer, TransferId,
};

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    account_numbers: HashSet<AccountNumber>,
    transactions: HashMap<TransactionId, Transaction>,
    references: HashSet<ReferenceNumber>,
    transfers: HashMap<TransferId, Transfer>,
    transfers_by_key: HashMap<IdempotencyKey, TransferId>,
}

/// In-memory `LedgerStore` implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.accounts.contains_key(&account.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "account {} already exists",
                account.id
            )));
        }
        if !inner.account_numbers.insert(account.account_number.clone()) {
            return Err(StoreError::ConstraintViolation(format!(
                "account number {} already exists",
                account.account_number
            )));
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(accounts)
    }

    async fn load_for_update(&self, id: AccountId) -> Result<Account, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }

    async fn commit(&self, bundle: CommitBundle) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");

        // Validate the whole bundle before touching anything. The unique
        // idempotency key decides races first, then stale snapshots, then
        // reference uniqueness.
        if let Some(transfer) = &bundle.transfer {
            if inner.transfers_by_key.contains_key(&transfer.idempotency_key) {
                return Err(
                    DomainError::DuplicateIdempotencyKey(transfer.idempotency_key.clone()).into(),
                );
            }
        }
        for account in &bundle.accounts {
            let current = inner
                .accounts
                .get(&account.id)
                .ok_or(DomainError::AccountNotFound(account.id))?;
            if current.version != account.version {
                return Err(StoreError::ConstraintViolation(format!(
                    "stale snapshot for account {}",
                    account.id
                )));
            }
        }
        for entry in &bundle.transactions {
            if inner.references.contains(&entry.reference) {
                return Err(StoreError::ConstraintViolation(format!(
                    "duplicate reference number {}",
                    entry.reference
                )));
            }
            if inner.transactions.contains_key(&entry.id) {
                return Err(StoreError::ConstraintViolation(format!(
                    "transaction {} already exists",
                    entry.id
                )));
            }
        }

        for mut account in bundle.accounts {
            account.version += 1;
            inner.accounts.insert(account.id, account);
        }
        for entry in bundle.transactions {
            inner.references.insert(entry.reference.clone());
            inner.transactions.insert(entry.id, entry);
        }
        if let Some(transfer) = bundle.transfer {
            inner
                .transfers_by_key
                .insert(transfer.idempotency_key.clone(), transfer.id);
            inner.transfers.insert(transfer.id, transfer);
        }
        Ok(())
    }

    async fn find_transfer_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Transfer>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .transfers_by_key
            .get(key)
            .and_then(|id| inner.transfers.get(id))
            .cloned())
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.transfers.get(&id).cloned())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.transactions.get(&id).cloned())
    }

    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut entries: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::{
        AccountType, Currency, CustomerId, EntryType, Money, ReferenceNumber, Transaction,
        TransferCategory,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), usd()).unwrap()
    }

    fn account(rng: &mut StdRng) -> Account {
        Account::open(
            CustomerId::new(),
            AccountNumber::generate(AccountType::Checking, rng),
            "test".to_string(),
            AccountType::Checking,
            usd(),
            money(10_000_00),
            money(50_000_00),
        )
        .unwrap()
    }

    fn entry(account: &Account, rng: &mut StdRng) -> Transaction {
        Transaction::record(
            account.id,
            EntryType::Deposit,
            money(10_00),
            account.balance,
            "test".to_string(),
            ReferenceNumber::generate(rng),
        )
    }

    #[tokio::test]
    async fn test_duplicate_account_number_rejected() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let first = account(&mut rng);
        let mut second = account(&mut rng);
        second.account_number = first.account_number.clone();

        store.insert_account(&first).await.unwrap();
        let result = store.insert_account(&second).await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_commit_bumps_version_and_rejects_stale_snapshots() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(2);
        let acct = account(&mut rng);
        store.insert_account(&acct).await.unwrap();

        let mut first = store.load_for_update(acct.id).await.unwrap();
        let second = store.load_for_update(acct.id).await.unwrap();

        first.credit(money(10_00)).unwrap();
        store
            .commit(CommitBundle {
                accounts: vec![first.clone()],
                transactions: vec![entry(&first, &mut rng)],
                transfer: None,
            })
            .await
            .unwrap();

        assert_eq!(store.get_account(acct.id).await.unwrap().unwrap().version, 1);

        // The snapshot loaded before the first commit is now stale.
        let result = store
            .commit(CommitBundle {
                accounts: vec![second],
                transactions: vec![],
                transfer: None,
            })
            .await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_rejected_without_side_effects() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut source = account(&mut rng);
        let mut target = account(&mut rng);
        source.credit(money(100_00)).unwrap();
        store.insert_account(&source).await.unwrap();
        store.insert_account(&target).await.unwrap();

        let run = |rng: &mut StdRng, source: &mut Account, target: &mut Account| {
            let plan = ledger_types::TransferPlan {
                category: TransferCategory::Internal,
                amount: money(10_00),
                fee_amount: None,
                description: "x".to_string(),
                idempotency_key: IdempotencyKey::new("same-key").unwrap(),
            };
            ledger_types::TransferService::execute_transfer(source, target, plan, rng).unwrap()
        };

        let mut s1 = store.load_for_update(source.id).await.unwrap();
        let mut t1 = store.load_for_update(target.id).await.unwrap();
        let records = run(&mut rng, &mut s1, &mut t1);
        store
            .commit(CommitBundle {
                accounts: vec![s1, t1],
                transactions: vec![records.debit, records.credit],
                transfer: Some(records.transfer),
            })
            .await
            .unwrap();

        let mut s2 = store.load_for_update(source.id).await.unwrap();
        let mut t2 = store.load_for_update(target.id).await.unwrap();
        let records = run(&mut rng, &mut s2, &mut t2);
        let result = store
            .commit(CommitBundle {
                accounts: vec![s2, t2],
                transactions: vec![records.debit.clone(), records.credit],
                transfer: Some(records.transfer),
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Domain(DomainError::DuplicateIdempotencyKey(_)))
        ));
        // The rejected bundle left nothing behind.
        assert!(
            store
                .get_transaction(records.debit.id)
                .await
                .unwrap()
                .is_none()
        );
        let balance = store
            .get_account(source.id)
            .await
            .unwrap()
            .unwrap()
            .balance;
        assert_eq!(balance, money(90_00));
    }
}
