use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use trailpay::application::balances::BalanceAggregator;
use trailpay::application::ledger::PaymentLedger;
use trailpay::application::release::{BulkResult, ReleaseEngine};
use trailpay::domain::filter::{PaymentFilter, SortOrder};
use trailpay::domain::payment::{PaymentMethod, PaymentStatus};
use trailpay::domain::ports::PaymentStoreArc;
use trailpay::infrastructure::in_memory::InMemoryPaymentStore;
#[cfg(feature = "storage-rocksdb")]
use trailpay::infrastructure::rocksdb::RocksDbPaymentStore;
use trailpay::interfaces::csv::payment_reader::PaymentReader;
use trailpay::interfaces::csv::report_writer::ReportWriter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ledger snapshot CSV to load before running the command
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List payments, filtered and paginated
    List {
        #[arg(long)]
        status: Option<PaymentStatus>,
        #[arg(long)]
        method: Option<PaymentMethod>,
        #[arg(long)]
        organizer: Option<u32>,
        #[arg(long)]
        event: Option<u32>,
        /// Free-text search over payer name/email, event title, transaction id
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// `newest` (default) or `oldest`
        #[arg(long, default_value = "newest")]
        order: SortOrder,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        size: usize,
    },
    /// Aggregate payment counts and collected sums
    Stats,
    /// Per-organizer pending/released balances
    Balances,
    /// Mark a PENDING payment as SUCCESS after gateway reconciliation
    Verify {
        id: String,
        #[arg(long)]
        actor: String,
    },
    /// Mark a SUCCESS payment as RELEASED to its organizer
    Release {
        id: String,
        #[arg(long)]
        actor: String,
        /// Settlement reference (mandatory), e.g. a bank slip number
        #[arg(long)]
        notes: String,
    },
    /// Release several payments; failures are itemized, not fatal
    BulkRelease {
        ids: Vec<String>,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        notes: String,
    },
    /// Export one organizer's payments as CSV
    Export {
        organizer: u32,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn open_store(cli: &Cli) -> Result<PaymentStoreArc> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        let store = RocksDbPaymentStore::open(db_path).into_diagnostic()?;
        return Ok(Arc::new(store));
    }
    #[cfg(not(feature = "storage-rocksdb"))]
    let _ = cli;
    Ok(Arc::new(InMemoryPaymentStore::new()))
}

async fn load_snapshot(ledger: &PaymentLedger, path: &PathBuf) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let reader = PaymentReader::new(file);
    for record_result in reader.payments() {
        match record_result {
            Ok(record) => {
                if let Err(e) = ledger.insert(record).await {
                    eprintln!("Error recording payment: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading payment: {}", e);
            }
        }
    }
    Ok(())
}

fn print_bulk_result(result: &BulkResult) {
    for id in &result.succeeded {
        println!("released,{id}");
    }
    for failure in &result.failed {
        println!("failed,{},{}", failure.id, failure.reason);
    }
    if result.is_complete() {
        println!("# all {} payment(s) released", result.succeeded.len());
    } else {
        println!(
            "# {} released, {} failed",
            result.succeeded.len(),
            result.failed.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store = open_store(&cli)?;
    let ledger = PaymentLedger::new(store.clone());
    let engine = ReleaseEngine::new(store.clone());
    let aggregator = BalanceAggregator::new(store);

    if let Some(input) = &cli.input {
        load_snapshot(&ledger, input).await?;
    }

    match cli.command {
        Command::List {
            status,
            method,
            organizer,
            event,
            search,
            from,
            to,
            order,
            page,
            size,
        } => {
            let filter = PaymentFilter {
                status,
                method,
                organizer,
                event,
                search,
                from,
                to,
                order,
            };
            let listing = ledger.list(&filter, page, size).await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer.write_payments(&listing.items).into_diagnostic()?;
            eprintln!("page {}, {} matching payment(s)", listing.page, listing.total);
        }
        Command::Stats => {
            let stats = ledger.stats().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer.write_stats(&stats).into_diagnostic()?;
        }
        Command::Balances => {
            let balances = aggregator.organizer_balances().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer.write_balances(&balances).into_diagnostic()?;
        }
        Command::Verify { id, actor } => {
            let record = engine.verify_payment(&id, &actor).await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer.write_payments([&record]).into_diagnostic()?;
        }
        Command::Release { id, actor, notes } => {
            let record = engine
                .release_payment(&id, &actor, &notes)
                .await
                .into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());
            writer.write_payments([&record]).into_diagnostic()?;
        }
        Command::BulkRelease { ids, actor, notes } => {
            let result = engine
                .bulk_release(&ids, &actor, &notes)
                .await
                .into_diagnostic()?;
            print_bulk_result(&result);
        }
        Command::Export { organizer, output } => {
            let records = ledger
                .payments_for_organizer(organizer)
                .await
                .into_diagnostic()?;
            match output {
                Some(path) => {
                    let file = File::create(path).into_diagnostic()?;
                    let mut writer = ReportWriter::new(file);
                    writer.write_payments(&records).into_diagnostic()?;
                }
                None => {
                    let stdout = io::stdout();
                    let mut writer = ReportWriter::new(stdout.lock());
                    writer.write_payments(&records).into_diagnostic()?;
                }
            }
        }
    }

    Ok(())
}
