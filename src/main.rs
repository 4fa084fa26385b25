//! Cash Reconciliation CLI
//!
//! Command-line tool for replaying a counting sheet against the
//! reconciliation engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --order ORD-1 --declared 1000000 sheet.csv > totals.csv
//! cargo run -- --kind provision --order ORD-2 --declared-bill 900000 \
//!     --declared-coin 100000 --tolerance 5000 --finalize sheet.csv
//! ```
//!
//! The program reads the counting sheet, registers a transaction of the
//! requested kind, saves the sheet's containers through the engine and
//! writes the resulting totals to stdout as CSV. With `--finalize` the
//! count is also closed, applying the tolerance gate. Audit events go to
//! stderr via tracing; RUST_LOG controls verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad arguments, unreadable sheet, a rejected batch, a failed
//!   finalize)

use cash_recon_engine::cli;
use cash_recon_engine::core::{
    CreateCollection, LoggingOrderSync, MemoryContainerStore, MemoryIncidentStore,
    MemoryTransactionStore, MemoryUnitOfWork, NewProvision, Orchestrator, TracingAudit,
};
use cash_recon_engine::io::sheet;
use cash_recon_engine::types::{EngineError, TransactionKind};
use std::fs::File;
use std::process;
use tracing::warn;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    if let Err(error) = run(&args) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), EngineError> {
    let file = File::open(&args.input_file)?;
    let (batch, row_errors) = sheet::read_sheet(file)?;
    for message in &row_errors {
        warn!("skipped sheet row: {}", message);
    }

    let transactions = MemoryTransactionStore::new();
    let containers = MemoryContainerStore::new();
    let incidents = MemoryIncidentStore::new();
    let unit_of_work = MemoryUnitOfWork::new();
    let engine = Orchestrator::new(
        &transactions,
        &containers,
        &incidents,
        &unit_of_work,
        TracingAudit,
        LoggingOrderSync,
        args.to_policy_set(),
    );

    let kind = TransactionKind::from(args.kind);
    let tx_id = match kind {
        TransactionKind::Collection => {
            let declared = args.declared_total.ok_or_else(|| EngineError::Parse {
                line: None,
                message: "--declared is required for collections".to_string(),
            })?;
            let id = transactions.seed(&args.order, kind, &args.currency);
            engine.create_collection(CreateCollection {
                tx: id,
                declared_total: declared,
                slip_number: args.slip_number.clone(),
                note: None,
                actor: 0,
            })?;
            id
        }
        TransactionKind::Provision => {
            engine
                .create_provision(NewProvision {
                    order_id: args.order.clone(),
                    currency: args.currency.clone(),
                    slip_number: args.slip_number.clone(),
                    declared_bill: args.declared_bill_or_zero(),
                    declared_coin: args.declared_coin_or_zero(),
                    declared_document: rust_decimal::Decimal::ZERO,
                    registered_by: 0,
                })?
                .id
        }
    };

    let totals = engine.save_containers(tx_id, batch, 0)?;
    if args.finalize {
        engine.finalize(tx_id, 0)?;
    }

    let mut stdout = std::io::stdout();
    sheet::write_totals_csv(&totals, &mut stdout)
}
