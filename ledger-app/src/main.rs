//! # Ledger Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize tracing
//! - Connect the SQLite store
//! - Drive the ledger service from a CLI

mod config;

use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use ledger_core::{
    DepositCommand, LedgerService, OpenAccountCommand, TransferCommand, WithdrawCommand,
};
use ledger_store::SqliteStore;
use ledger_types::{
    Account, AccountId, AccountType, Currency, IdempotencyKey, Money, TransferCategory,
};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(author, version, about = "Core banking ledger CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },
    /// Money movement operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Open a new account
    Open {
        /// Customer ID (UUID)
        #[arg(long)]
        customer: String,
        /// Account type (checking, savings, fixed-deposit)
        #[arg(long, default_value = "checking")]
        account_type: String,
        /// ISO-4217 currency code
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Display alias; generated when omitted
        #[arg(long)]
        alias: Option<String>,
    },
    /// Show account details
    Get {
        /// Account ID (UUID)
        id: String,
    },
    /// List all accounts
    List,
}

#[derive(Subcommand)]
enum TxCommands {
    /// Deposit funds into an account
    Deposit {
        #[arg(long)]
        account: String,
        /// Decimal amount in the account currency, e.g. 125.50
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "deposit")]
        description: String,
    },
    /// Withdraw funds from an account
    Withdraw {
        #[arg(long)]
        account: String,
        /// Decimal amount in the account currency
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "withdrawal")]
        description: String,
    },
    /// Transfer funds between accounts
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Decimal amount in the source account currency
        #[arg(long)]
        amount: String,
        /// Optional fee charged to the source account
        #[arg(long)]
        fee: Option<String>,
        #[arg(long, default_value = "transfer")]
        description: String,
        /// Idempotency key; replaying it returns the recorded transfer
        #[arg(long)]
        idempotency_key: String,
        /// Transfer category (internal, external)
        #[arg(long, default_value = "internal")]
        category: String,
    },
    /// Show the ledger entries of an account, newest first
    History {
        /// Account ID (UUID)
        account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ledger_core=debug,ledger_store=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    tracing::info!("using database: {}", config.database_url);

    let store = SqliteStore::connect(&config.database_url).await?;
    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let service = LedgerService::new(store, rng);

    match cli.command {
        Commands::Account { action } => run_account(&service, action).await,
        Commands::Tx { action } => run_tx(&service, action).await,
    }
}

async fn run_account(
    service: &LedgerService<SqliteStore, StdRng>,
    action: AccountCommands,
) -> Result<()> {
    match action {
        AccountCommands::Open {
            customer,
            account_type,
            currency,
            alias,
        } => {
            let account = service
                .open_account(OpenAccountCommand {
                    customer_id: customer.parse()?,
                    account_type: account_type.parse::<AccountType>()?,
                    currency: Currency::new(&currency.to_ascii_uppercase())?,
                    alias,
                })
                .await?;
            print_json(&account)
        }
        AccountCommands::Get { id } => {
            let account = service.get_account(id.parse::<AccountId>()?).await?;
            print_json(&account)
        }
        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            print_json(&accounts)
        }
    }
}

async fn run_tx(service: &LedgerService<SqliteStore, StdRng>, action: TxCommands) -> Result<()> {
    match action {
        TxCommands::Deposit {
            account,
            amount,
            description,
        } => {
            let account_id = account.parse::<AccountId>()?;
            let amount = parse_amount(service, account_id, &amount).await?;
            let entry = service
                .deposit(DepositCommand {
                    account_id,
                    amount,
                    description,
                })
                .await?;
            print_json(&entry)
        }
        TxCommands::Withdraw {
            account,
            amount,
            description,
        } => {
            let account_id = account.parse::<AccountId>()?;
            let amount = parse_amount(service, account_id, &amount).await?;
            let entry = service
                .withdraw(WithdrawCommand {
                    account_id,
                    amount,
                    description,
                })
                .await?;
            print_json(&entry)
        }
        TxCommands::Transfer {
            from,
            to,
            amount,
            fee,
            description,
            idempotency_key,
            category,
        } => {
            let source_account_id = from.parse::<AccountId>()?;
            let amount = parse_amount(service, source_account_id, &amount).await?;
            let fee_amount = match fee {
                Some(fee) => Some(Money::new(Decimal::from_str(&fee)?, amount.currency())?),
                None => None,
            };
            let receipt = service
                .transfer(TransferCommand {
                    source_account_id,
                    target_account_id: to.parse::<AccountId>()?,
                    category: category.parse::<TransferCategory>()?,
                    amount,
                    fee_amount,
                    description,
                    idempotency_key: IdempotencyKey::new(idempotency_key)?,
                })
                .await?;
            if receipt.replayed {
                tracing::info!("idempotent replay: returning the previously recorded transfer");
            }
            print_json(&receipt.transfer)
        }
        TxCommands::History { account } => {
            let entries = service.account_history(account.parse::<AccountId>()?).await?;
            print_json(&entries)
        }
    }
}

/// Parses a decimal amount in the currency of the given account.
async fn parse_amount(
    service: &LedgerService<SqliteStore, StdRng>,
    account_id: AccountId,
    amount: &str,
) -> Result<Money> {
    let account: Account = service.get_account(account_id).await?;
    Ok(Money::new(Decimal::from_str(amount)?, account.currency)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
