use std::{collections::BTreeMap, error::Error, fs, path::PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use ledger::{
    Currency, IouMessageKind, Ledger, OriginalMessage, Report, ReportAction, Transaction,
    collections,
};
use serde_json::Value;
use store::{Patch, Store};

#[derive(Parser, Debug)]
#[command(name = "notaspese")]
#[command(about = "Operator utilities for notaspese store snapshots")]
struct Cli {
    /// Snapshot file holding the raw store key space as one JSON object.
    #[arg(
        long,
        env = "NOTASPESE_SNAPSHOT",
        default_value = "./notaspese.json"
    )]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a small demo snapshot to start from.
    Seed(SeedArgs),
    /// Print reports with their cached totals and action counts.
    Show(ShowArgs),
    /// Move transactions onto another expense report.
    Move(MoveArgs),
    /// Clear stored errors on a report action.
    ClearErrors(ClearErrorsArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Currency for the seeded expenses.
    #[arg(long, default_value = "USD")]
    currency: String,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Restrict output to one report id.
    #[arg(long)]
    report: Option<String>,
}

#[derive(Args, Debug)]
struct MoveArgs {
    /// Destination report id.
    #[arg(long = "to")]
    destination: String,
    /// Transaction ids to move.
    #[arg(required = true)]
    transaction_ids: Vec<String>,
    /// Write the updated snapshot back to disk.
    #[arg(long)]
    write: bool,
}

#[derive(Args, Debug)]
struct ClearErrorsArgs {
    /// Report holding the action.
    #[arg(long)]
    report: String,
    /// Action id to clear.
    #[arg(long)]
    action: String,
    /// Error keys to clear; omit to clear every error on the action.
    #[arg(long = "key")]
    keys: Vec<String>,
    /// Also clear matching errors on parent/child thread actions.
    #[arg(long)]
    related: bool,
    /// Write the updated snapshot back to disk.
    #[arg(long)]
    write: bool,
}

type ResultMain<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> ResultMain<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notaspese=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Seed(args) => {
            let currency = Currency::try_from(args.currency.as_str())?;
            seed(&cli.snapshot, currency).await
        }
        Command::Show(args) => {
            let ledger = load_snapshot(&cli.snapshot).await?;
            show(&ledger, args.report.as_deref()).await
        }
        Command::Move(args) => {
            let ledger = load_snapshot(&cli.snapshot).await?;
            ledger
                .change_transactions_report(&args.transaction_ids, &args.destination)
                .await?;
            show(&ledger, None).await?;
            if args.write {
                write_snapshot(&ledger, &cli.snapshot).await?;
            }
            Ok(())
        }
        Command::ClearErrors(args) => {
            let ledger = load_snapshot(&cli.snapshot).await?;
            let actions = ledger.report_actions(&args.report).await?;
            let action = actions
                .get(&args.action)
                .ok_or_else(|| format!("no action {} under report {}", args.action, args.report))?;

            if args.related {
                ledger
                    .clear_all_related_report_action_errors(&args.report, action)
                    .await?;
            } else {
                let keys = (!args.keys.is_empty()).then_some(args.keys.as_slice());
                ledger
                    .clear_report_action_errors(&args.report, action, keys)
                    .await?;
            }
            if args.write {
                write_snapshot(&ledger, &cli.snapshot).await?;
            }
            Ok(())
        }
    }
}

async fn load_snapshot(path: &PathBuf) -> ResultMain<Ledger> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read snapshot {}: {err}", path.display()))?;
    let records: BTreeMap<String, Value> = serde_json::from_str(&raw)?;
    tracing::info!("loaded {} records from {}", records.len(), path.display());

    let store = Store::new();
    store.init_with(records).await;
    Ok(Ledger::new(store))
}

async fn write_snapshot(ledger: &Ledger, path: &PathBuf) -> ResultMain<()> {
    let records = ledger.store().snapshot().await;
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    tracing::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

async fn show(ledger: &Ledger, only_report: Option<&str>) -> ResultMain<()> {
    let reports = ledger
        .store()
        .collection::<Report>(collections::REPORT)
        .await?;
    let transactions = ledger
        .store()
        .collection::<Transaction>(collections::TRANSACTION)
        .await?;

    for report in reports.values() {
        if only_report.is_some_and(|id| id != report.report_id) {
            continue;
        }
        let actions = ledger.report_actions(&report.report_id).await?;
        println!(
            "report {} ({:?}/{:?}) total={} non_reimbursable_total={} actions={}",
            report.report_id,
            report.kind,
            report.status,
            report.total,
            report.non_reimbursable_total,
            actions.len(),
        );
        for transaction in transactions.values() {
            if transaction.report_id == report.report_id {
                println!(
                    "  transaction {} amount={} {} reimbursable={}",
                    transaction.transaction_id,
                    transaction.amount_minor,
                    transaction.currency,
                    transaction.reimbursable,
                );
            }
        }
    }
    Ok(())
}

/// Builds two expense reports, a self-DM, and a pair of expenses (one still
/// unreported) so every subcommand has something to chew on.
async fn seed(path: &PathBuf, currency: Currency) -> ResultMain<()> {
    let store = Store::new();
    let now = Utc::now();

    let travel = Report {
        total: 500,
        non_reimbursable_total: 100,
        ..Report::expense("travel-report", 1)
    };
    let office = Report::expense("office-report", 1);
    let self_dm = Report::self_dm("self-dm", 1);

    for report in [&travel, &office, &self_dm] {
        store
            .set(&collections::report_key(&report.report_id), report)
            .await?;
    }

    let mut lunch = Transaction::new("travel-report", 500, currency, now);
    lunch.comment = "team lunch".to_string();
    let taxi = Transaction::unreported(1800, currency, now);

    for transaction in [&lunch, &taxi] {
        store
            .set(
                &collections::transaction_key(&transaction.transaction_id),
                transaction,
            )
            .await?;
    }

    let lunch_action = ReportAction::iou(
        1,
        OriginalMessage {
            iou_report_id: Some(lunch.report_id.clone()),
            iou_transaction_id: Some(lunch.transaction_id.clone()),
            amount_minor: lunch.amount_minor,
            currency: lunch.currency,
            kind: IouMessageKind::Create,
        },
        now,
    );
    let taxi_action = ReportAction::iou(
        1,
        OriginalMessage {
            iou_report_id: None,
            iou_transaction_id: Some(taxi.transaction_id.clone()),
            amount_minor: taxi.amount_minor,
            currency: taxi.currency,
            kind: IouMessageKind::Track,
        },
        now,
    );

    store
        .merge(
            &collections::report_actions_key(&lunch.report_id),
            Patch::field(lunch_action.report_action_id.clone(), Patch::set(&lunch_action)?),
        )
        .await;
    store
        .merge(
            &collections::report_actions_key(&self_dm.report_id),
            Patch::field(taxi_action.report_action_id.clone(), Patch::set(&taxi_action)?),
        )
        .await;

    let records = store.snapshot().await;
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    tracing::info!("seeded {} records into {}", records.len(), path.display());
    Ok(())
}
