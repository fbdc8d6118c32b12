//! Transfer domain service: the money-movement algorithm.
//!
//! Pure and synchronous. It mutates the account snapshots handed to it and
//! returns the records to persist; it never touches storage, logs, or
//! blocks. On an error the caller must discard the mutated snapshots -
//! nothing is durable until the whole bundle commits atomically.

use rand::Rng;

use super::account::Account;
use super::money::Money;
use super::transaction::{EntryType, ReferenceNumber, Transaction};
use super::transfer::{IdempotencyKey, Transfer, TransferCategory};
use crate::error::DomainError;

/// Everything needed to execute one transfer.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub category: TransferCategory,
    pub amount: Money,
    pub fee_amount: Option<Money>,
    pub description: String,
    pub idempotency_key: IdempotencyKey,
}

/// The records produced by one executed transfer, returned as a unit for
/// atomic persistence by the collaborator.
#[derive(Debug, Clone)]
pub struct TransferRecords {
    pub debit: Transaction,
    pub fee: Option<Transaction>,
    pub credit: Transaction,
    pub transfer: Transfer,
}

/// Executes money movements against loaded account aggregates.
pub struct TransferService;

impl TransferService {
    /// Debits `plan.amount` (and the optional fee) from `source`, credits
    /// `target`, and returns the ledger entries plus the linking transfer.
    ///
    /// The fee is a second, independent debit with its own balance
    /// snapshot. If it fails - say the source can cover the principal but
    /// not the fee - the whole operation is abandoned and the caller
    /// discards both snapshots; there is no in-memory compensation.
    pub fn execute_transfer<R: Rng>(
        source: &mut Account,
        target: &mut Account,
        plan: TransferPlan,
        rng: &mut R,
    ) -> Result<TransferRecords, DomainError> {
        if source.id == target.id {
            return Err(DomainError::SameAccountTransfer(source.id));
        }
        if plan.amount.gt(&source.daily_transfer_limit)? {
            return Err(DomainError::TransferLimitExceeded {
                requested: plan.amount,
                limit: source.daily_transfer_limit,
            });
        }

        source.debit(plan.amount)?;
        let debit = Transaction::record(
            source.id,
            EntryType::TransferOut,
            plan.amount,
            source.balance,
            plan.description.clone(),
            ReferenceNumber::generate(rng),
        );

        let fee = match plan.fee_amount {
            Some(fee_amount) if !fee_amount.is_zero() => {
                source.debit(fee_amount)?;
                Some(Transaction::record(
                    source.id,
                    EntryType::Fee,
                    fee_amount,
                    source.balance,
                    format!("fee: {}", plan.description),
                    ReferenceNumber::generate(rng),
                ))
            }
            _ => None,
        };

        target.credit(plan.amount)?;
        let credit = Transaction::record(
            target.id,
            EntryType::TransferIn,
            plan.amount,
            target.balance,
            plan.description.clone(),
            ReferenceNumber::generate(rng),
        );

        let transfer = Transfer::new(
            source.id,
            target.id,
            plan.category,
            plan.amount,
            fee.as_ref().map(|t| t.amount),
            plan.description,
            debit.id,
            credit.id,
            fee.as_ref().map(|t| t.id),
            plan.idempotency_key,
        );

        Ok(TransferRecords {
            debit,
            fee,
            credit,
            transfer,
        })
    }

    /// Credits a deposit from outside the ledger. No transfer aggregate.
    pub fn execute_deposit<R: Rng>(
        account: &mut Account,
        amount: Money,
        description: String,
        rng: &mut R,
    ) -> Result<Transaction, DomainError> {
        account.credit(amount)?;
        Ok(Transaction::record(
            account.id,
            EntryType::Deposit,
            amount,
            account.balance,
            description,
            ReferenceNumber::generate(rng),
        ))
    }

    /// Debits a withdrawal to outside the ledger. No transfer aggregate.
    pub fn execute_withdrawal<R: Rng>(
        account: &mut Account,
        amount: Money,
        description: String,
        rng: &mut R,
    ) -> Result<Transaction, DomainError> {
        account.debit(amount)?;
        Ok(Transaction::record(
            account.id,
            EntryType::Withdrawal,
            amount,
            account.balance,
            description,
            ReferenceNumber::generate(rng),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountType, CustomerId};
    use crate::domain::account_number::AccountNumber;
    use crate::domain::money::Currency;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), usd()).unwrap()
    }

    fn funded_account(cents: i64, rng: &mut StdRng) -> Account {
        let mut account = Account::open(
            CustomerId::new(),
            AccountNumber::generate(AccountType::Checking, rng),
            "test".to_string(),
            AccountType::Checking,
            usd(),
            money(10_000_00),
            money(50_000_00),
        )
        .unwrap();
        if cents > 0 {
            account.credit(money(cents)).unwrap();
        }
        account
    }

    fn plan(cents: i64, fee_cents: Option<i64>) -> TransferPlan {
        TransferPlan {
            category: TransferCategory::Internal,
            amount: money(cents),
            fee_amount: fee_cents.map(money),
            description: "rent".to_string(),
            idempotency_key: IdempotencyKey::new("key-1").unwrap(),
        }
    }

    #[test]
    fn test_transfer_moves_funds_and_links_entries() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(1_000_00, &mut rng);
        let mut target = funded_account(500_00, &mut rng);

        let records =
            TransferService::execute_transfer(&mut source, &mut target, plan(100_00, None), &mut rng)
                .unwrap();

        assert_eq!(source.balance, money(900_00));
        assert_eq!(target.balance, money(600_00));

        assert_eq!(records.debit.entry_type, EntryType::TransferOut);
        assert_eq!(records.debit.balance_after, money(900_00));
        assert_eq!(records.credit.entry_type, EntryType::TransferIn);
        assert_eq!(records.credit.balance_after, money(600_00));
        assert!(records.fee.is_none());

        assert_eq!(records.transfer.debit_transaction_id, records.debit.id);
        assert_eq!(records.transfer.credit_transaction_id, records.credit.id);
        assert_eq!(records.transfer.fee_transaction_id, None);
    }

    #[test]
    fn test_fee_is_a_second_independent_debit() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(102_00, &mut rng);
        let mut target = funded_account(0, &mut rng);

        let records = TransferService::execute_transfer(
            &mut source,
            &mut target,
            plan(100_00, Some(2_00)),
            &mut rng,
        )
        .unwrap();

        assert!(source.balance.is_zero());
        let fee = records.fee.unwrap();
        assert_eq!(fee.entry_type, EntryType::Fee);
        // Fee snapshot is taken after the principal debit
        assert_eq!(records.debit.balance_after, money(2_00));
        assert!(fee.balance_after.is_zero());
        assert_eq!(records.transfer.fee_transaction_id, Some(fee.id));
    }

    #[test]
    fn test_unpayable_fee_aborts_whole_operation() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(101_00, &mut rng);
        let mut target = funded_account(0, &mut rng);

        let result = TransferService::execute_transfer(
            &mut source,
            &mut target,
            plan(100_00, Some(2_00)),
            &mut rng,
        );

        assert!(matches!(result, Err(DomainError::InsufficientFunds { .. })));
        // The in-memory snapshot carries the principal debit; the caller
        // discards it instead of committing.
        assert_eq!(source.balance, money(1_00));
    }

    #[test]
    fn test_zero_fee_records_no_fee_entry() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(100_00, &mut rng);
        let mut target = funded_account(0, &mut rng);

        let records = TransferService::execute_transfer(
            &mut source,
            &mut target,
            plan(100_00, Some(0)),
            &mut rng,
        )
        .unwrap();

        assert!(records.fee.is_none());
        assert_eq!(records.transfer.fee_amount, None);
    }

    #[test]
    fn test_same_account_rejected() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(100_00, &mut rng);
        let mut twin = source.clone();

        let result =
            TransferService::execute_transfer(&mut source, &mut twin, plan(10_00, None), &mut rng);

        assert!(matches!(result, Err(DomainError::SameAccountTransfer(_))));
    }

    #[test]
    fn test_amount_above_daily_limit_rejected() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut source = funded_account(20_000_00, &mut rng);
        let mut target = funded_account(0, &mut rng);

        let result = TransferService::execute_transfer(
            &mut source,
            &mut target,
            plan(10_001_00, None),
            &mut rng,
        );

        assert!(matches!(
            result,
            Err(DomainError::TransferLimitExceeded { .. })
        ));
        assert_eq!(source.balance, money(20_000_00));
    }

    #[test]
    fn test_deposit_and_withdrawal_entries() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut account = funded_account(0, &mut rng);

        let deposit =
            TransferService::execute_deposit(&mut account, money(50_00), "cash".into(), &mut rng)
                .unwrap();
        assert_eq!(deposit.entry_type, EntryType::Deposit);
        assert_eq!(deposit.balance_after, money(50_00));

        let withdrawal = TransferService::execute_withdrawal(
            &mut account,
            money(20_00),
            "atm".into(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(withdrawal.entry_type, EntryType::Withdrawal);
        assert_eq!(withdrawal.balance_after, money(30_00));
        assert_eq!(account.balance, money(30_00));
    }
}
