//! SqliteStore integration tests against an in-memory database.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use ledger_types::{
    Account, AccountNumber, AccountType, CommitBundle, Currency, CustomerId, DomainError,
    IdempotencyKey, LedgerStore, Money, StoreError, TransferCategory, TransferPlan,
    TransferService,
};

use crate::sqlite::SqliteStore;

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

async fn store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:").await.unwrap()
}

fn plan(key: &str, cents: i64) -> TransferPlan {
    TransferPlan {
        category: TransferCategory::Internal,
        amount: money(cents),
        fee_amount: None,
        description: "test transfer".to_string(),
        idempotency_key: IdempotencyKey::new(key).unwrap(),
    }
}

#[tokio::test]
async fn test_account_round_trip() {
    let store = store().await;
    let mut rng = StdRng::seed_from_u64(1);
    let mut acct = account(&mut rng);
    acct.credit(money(123_45)).unwrap();

    store.insert_account(&acct).await.unwrap();
    let loaded = store.get_account(acct.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, acct.id);
    assert_eq!(loaded.account_number, acct.account_number);
    assert_eq!(loaded.balance, money(123_45));
    assert_eq!(loaded.available_balance, money(123_45));
    assert_eq!(loaded.status, acct.status);
    assert_eq!(loaded.version, 0);
}

#[tokio::test]
async fn test_missing_account_load_for_update() {
    let store = store().await;
    let result = store
        .load_for_update(ledger_types::AccountId::new())
        .await;
    assert!(matches!(
        result,
        Err(StoreError::Domain(DomainError::AccountNotFound(_)))
    ));
}

#[tokio::test]
async fn test_duplicate_account_number_rejected() {
    let store = store().await;
    let mut rng = StdRng::seed_from_u64(2);
    let first = account(&mut rng);
    let mut second = account(&mut rng);
    second.account_number = first.account_number.clone();

    store.insert_account(&first).await.unwrap();
    let result = store.insert_account(&second).await;
    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
}

#[tokio::test]
async fn test_transfer_commit_round_trip() {
    let store = store().await;
    let mut rng = StdRng::seed_from_u64(3);
    let mut source = account(&mut rng);
    let target = account(&mut rng);
    source.credit(money(1_000_00)).unwrap();
    store.insert_account(&source).await.unwrap();
    store.insert_account(&target).await.unwrap();

    let mut s = store.load_for_update(source.id).await.unwrap();
    let mut t = store.load_for_update(target.id).await.unwrap();
    let records =
        TransferService::execute_transfer(&mut s, &mut t, plan("key-1", 100_00), &mut rng)
            .unwrap();

    store
        .commit(CommitBundle {
            accounts: vec![s, t],
            transactions: vec![records.debit.clone(), records.credit.clone()],
            transfer: Some(records.transfer.clone()),
        })
        .await
        .unwrap();

    let source_after = store.get_account(source.id).await.unwrap().unwrap();
    let target_after = store.get_account(target.id).await.unwrap().unwrap();
    assert_eq!(source_after.balance, money(900_00));
    assert_eq!(target_after.balance, money(100_00));
    assert_eq!(source_after.version, 1);

    let found = store
        .find_transfer_by_key(&IdempotencyKey::new("key-1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, records.transfer.id);
    assert_eq!(found.debit_transaction_id, records.debit.id);
    assert_eq!(found.amount, money(100_00));

    let history = store
        .list_transactions_for_account(source.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, records.debit.id);
    assert_eq!(history[0].balance_after, money(900_00));
}

#[tokio::test]
async fn test_duplicate_idempotency_key_rolls_back_everything() {
    let store = store().await;
    let mut rng = StdRng::seed_from_u64(4);
    let mut source = account(&mut rng);
    let target = account(&mut rng);
    source.credit(money(1_000_00)).unwrap();
    store.insert_account(&source).await.unwrap();
    store.insert_account(&target).await.unwrap();

    // First commit wins.
    let mut s = store.load_for_update(source.id).await.unwrap();
    let mut t = store.load_for_update(target.id).await.unwrap();
    let records =
        TransferService::execute_transfer(&mut s, &mut t, plan("same-key", 100_00), &mut rng)
            .unwrap();
    store
        .commit(CommitBundle {
            accounts: vec![s, t],
            transactions: vec![records.debit, records.credit],
            transfer: Some(records.transfer),
        })
        .await
        .unwrap();

    // Second commit with the same key fails and leaves no trace.
    let mut s = store.load_for_update(source.id).await.unwrap();
    let mut t = store.load_for_update(target.id).await.unwrap();
    let records =
        TransferService::execute_transfer(&mut s, &mut t, plan("same-key", 100_00), &mut rng)
            .unwrap();
    let result = store
        .commit(CommitBundle {
            accounts: vec![s, t],
            transactions: vec![records.debit.clone(), records.credit],
            transfer: Some(records.transfer),
        })
        .await;

    assert!(matches!(
        result,
        Err(StoreError::Domain(DomainError::DuplicateIdempotencyKey(_)))
    ));

    // Account updates and entry inserts from the losing bundle rolled back.
    let source_after = store.get_account(source.id).await.unwrap().unwrap();
    assert_eq!(source_after.balance, money(900_00));
    assert_eq!(source_after.version, 1);
    assert!(
        store
            .get_transaction(records.debit.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_stale_snapshot_rejected() {
    let store = store().await;
    let mut rng = StdRng::seed_from_u64(5);
    let acct = account(&mut rng);
    store.insert_account(&acct).await.unwrap();

    let mut fresh = store.load_for_update(acct.id).await.unwrap();
    let mut stale = store.load_for_update(acct.id).await.unwrap();

    fresh.credit(money(10_00)).unwrap();
    store
        .commit(CommitBundle {
            accounts: vec![fresh],
            transactions: vec![],
            transfer: None,
        })
        .await
        .unwrap();

    stale.credit(money(20_00)).unwrap();
    let result = store
        .commit(CommitBundle {
            accounts: vec![stale],
            transactions: vec![],
            transfer: None,
        })
        .await;

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    let after = store.get_account(acct.id).await.unwrap().unwrap();
    assert_eq!(after.balance, money(10_00));
}
