use bullion_ledger::application::ledger::{LedgerCore, LedgerDelta};
use bullion_ledger::application::reconciler::PaymentReconciler;
use bullion_ledger::application::withdrawal::{Decision, WithdrawalWorkflow};
use bullion_ledger::domain::account::Amount;
use bullion_ledger::domain::ports::{
    AccountStoreBox, DepositStoreBox, IntentStoreBox, NotifierArc, PaymentGatewayBox,
    WithdrawalStoreBox,
};
use bullion_ledger::domain::withdrawal::{Destination, ResourceKind};
use bullion_ledger::infrastructure::gateway::{GatewayConfig, HttpGateway, OfflineGateway};
use bullion_ledger::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryDepositStore, InMemoryIntentStore, InMemoryWithdrawalStore,
};
use bullion_ledger::infrastructure::notify::TracingNotifier;
use bullion_ledger::interfaces::csv::command_reader::{Command, CommandReader, CommandType};
use bullion_ledger::interfaces::csv::report_writer::ReportWriter;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Payment gateway base URL. Without it, deposits settle through the
    /// offline gateway.
    #[arg(long)]
    gateway_url: Option<String>,

    /// Shared secret for the payment gateway.
    #[arg(long, requires = "gateway_url")]
    gateway_secret: Option<String>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Engine {
    ledger: Arc<LedgerCore>,
    withdrawals: WithdrawalWorkflow,
    reconciler: PaymentReconciler,
}

fn build_engine(cli: &Cli) -> Result<Engine> {
    let gateway: PaymentGatewayBox = match &cli.gateway_url {
        Some(url) => Box::new(HttpGateway::new(GatewayConfig {
            base_url: url.clone(),
            secret: cli.gateway_secret.clone().unwrap_or_default(),
        })),
        None => Box::new(OfflineGateway),
    };
    let notifier: NotifierArc = Arc::new(TracingNotifier);

    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        use bullion_ledger::infrastructure::rocksdb::RocksDbStore;
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        let accounts: AccountStoreBox = Box::new(store.clone());
        let withdrawals: WithdrawalStoreBox = Box::new(store.clone());
        let intents: IntentStoreBox = Box::new(store.clone());
        let deposits: DepositStoreBox = Box::new(store);

        let ledger = Arc::new(LedgerCore::new(accounts));
        return Ok(Engine {
            withdrawals: WithdrawalWorkflow::new(
                Arc::clone(&ledger),
                withdrawals,
                Arc::clone(&notifier),
            ),
            reconciler: PaymentReconciler::new(
                gateway,
                intents,
                deposits,
                Arc::clone(&ledger),
                notifier,
            ),
            ledger,
        });
    }

    let accounts: AccountStoreBox = Box::new(InMemoryAccountStore::new());
    let withdrawals: WithdrawalStoreBox = Box::new(InMemoryWithdrawalStore::new());
    let intents: IntentStoreBox = Box::new(InMemoryIntentStore::new());
    let deposits: DepositStoreBox = Box::new(InMemoryDepositStore::new());

    let ledger = Arc::new(LedgerCore::new(accounts));
    Ok(Engine {
        withdrawals: WithdrawalWorkflow::new(
            Arc::clone(&ledger),
            withdrawals,
            Arc::clone(&notifier),
        ),
        reconciler: PaymentReconciler::new(gateway, intents, deposits, Arc::clone(&ledger), notifier),
        ledger,
    })
}

/// Applies one command. `refs` maps file-scoped withdrawal references to the
/// request ids the workflow handed back.
async fn apply(
    engine: &Engine,
    refs: &mut HashMap<u32, Uuid>,
    command: Command,
) -> bullion_ledger::Result<()> {
    let missing = |field: &str| {
        bullion_ledger::LedgerError::Validation(format!("{field} is required for this command"))
    };

    match command.r#type {
        CommandType::Deposit => {
            let amount = Amount::new(command.amount.ok_or_else(|| missing("amount"))?)?;
            let intent = engine.reconciler.create(command.user, amount).await?;
            engine.reconciler.poll(&intent.txn_id).await?;
        }
        CommandType::Acquire => {
            let quantity = Amount::new(command.amount.ok_or_else(|| missing("amount"))?)?;
            let cost = command.cost.ok_or_else(|| missing("cost"))?;
            let asset = command.asset.ok_or_else(|| missing("asset"))?;
            let lease = engine.ledger.lease(command.user).await?;
            engine
                .ledger
                .apply_delta(&lease, LedgerDelta::AssetCredit { asset, quantity, cost })
                .await?;
        }
        CommandType::Withdraw | CommandType::WithdrawAsset => {
            let amount = Amount::new(command.amount.ok_or_else(|| missing("amount"))?)?;
            let (resource, destination) = match command.r#type {
                CommandType::Withdraw => (
                    ResourceKind::Balance,
                    Destination::Bank {
                        bank_name: String::new(),
                        account_number: String::new(),
                        holder: String::new(),
                    },
                ),
                _ => (
                    ResourceKind::Holding(command.asset.ok_or_else(|| missing("asset"))?),
                    Destination::Shipping {
                        recipient: String::new(),
                        phone: String::new(),
                        address: String::new(),
                    },
                ),
            };
            let request = engine
                .withdrawals
                .create(command.user, resource, amount, destination)
                .await?;
            if let Some(r) = command.r#ref {
                refs.insert(r, request.id);
            }
        }
        CommandType::Approve | CommandType::Reject => {
            let r = command.r#ref.ok_or_else(|| missing("ref"))?;
            let id = refs
                .get(&r)
                .copied()
                .ok_or_else(|| bullion_ledger::LedgerError::NotFound(format!("reference {r}")))?;
            let decision = if command.r#type == CommandType::Approve {
                Decision::Approved
            } else {
                Decision::Rejected
            };
            engine.withdrawals.resolve(id, decision).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = build_engine(&cli)?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut refs = HashMap::new();
    for result in reader.commands() {
        match result {
            Ok(command) => {
                if let Err(e) = apply(&engine, &mut refs, command).await {
                    tracing::warn!(error = %e, "command rejected");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed command row");
            }
        }
    }

    let accounts = engine.ledger.accounts().await.into_diagnostic()?;
    let holdings = engine.ledger.all_holdings().await.into_diagnostic()?;

    let stdout = io::stdout();
    let writer = ReportWriter::new(stdout.lock());
    writer.write_report(accounts, holdings).into_diagnostic()?;

    Ok(())
}
