//! End-to-end reconciliation scenarios
//!
//! These tests drive the engine through the public library surface exactly
//! the way the CLI does: a counting sheet goes through the CSV reader, the
//! resulting drafts go through the orchestrator, and the assertions land on
//! the persisted transaction and its totals. Covered flows:
//! - Collection happy path from registration to approval
//! - Provision flow through review, readiness and delivery
//! - Tolerance gates, at finalize for collections and at approval for
//!   provisions
//! - Batch validation rejecting a sheet before anything is persisted
//! - Incident approval feeding the difference

use cash_recon_engine::core::{
    ContainerStore, CreateCollection, IncidentDecision, IncidentStore, LoggingOrderSync,
    MemoryContainerStore, MemoryIncidentStore, MemoryTransactionStore, MemoryUnitOfWork,
    NewIncident, NewProvision, Orchestrator, TracingAudit, TransactionStore,
};
use cash_recon_engine::io::sheet::{read_sheet, write_totals_csv};
use cash_recon_engine::policy::{CountingPolicy, EnvelopePolicy, PolicySet, TolerancePolicy};
use cash_recon_engine::types::{
    ContainerDraft, EngineError, ErrorKind, IncidentAmount, IncidentCategory, IncidentOwner,
    IncidentStatus, TransactionKind, TransactionStatus,
};
use rust_decimal::Decimal;
use std::io::{Read, Seek, Write};
use tempfile::NamedTempFile;

const SHEET_HEADER: &str = "container,container_type,envelope_kind,parent,declared_value,cashier_name,cashier_document,value_type,denomination,bundle_size,quality,quantity,bundles,loose,unit_value,amount,high,check_number,bank";

struct Harness {
    transactions: MemoryTransactionStore,
    containers: MemoryContainerStore,
    incidents: MemoryIncidentStore,
    unit_of_work: MemoryUnitOfWork,
}

impl Harness {
    fn new() -> Self {
        Harness {
            transactions: MemoryTransactionStore::new(),
            containers: MemoryContainerStore::new(),
            incidents: MemoryIncidentStore::new(),
            unit_of_work: MemoryUnitOfWork::new(),
        }
    }

    #[allow(clippy::type_complexity)]
    fn engine(
        &self,
        tolerance: TolerancePolicy,
    ) -> Orchestrator<
        &MemoryTransactionStore,
        &MemoryContainerStore,
        &MemoryIncidentStore,
        &MemoryUnitOfWork,
        TracingAudit,
        LoggingOrderSync,
    > {
        Orchestrator::new(
            &self.transactions,
            &self.containers,
            &self.incidents,
            &self.unit_of_work,
            TracingAudit,
            LoggingOrderSync,
            PolicySet {
                counting: CountingPolicy::default(),
                tolerance,
                envelope: EnvelopePolicy::default(),
            },
        )
    }
}

/// Write a sheet to a temp file and read it back through the CSV layer
fn drafts_from_sheet(rows: &[&str]) -> Vec<ContainerDraft> {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "{}", SHEET_HEADER).expect("write header");
    for row in rows {
        writeln!(file, "{}", row).expect("write row");
    }
    file.rewind().expect("rewind");
    let (drafts, errors) = read_sheet(file.as_file_mut()).expect("read sheet");
    assert!(errors.is_empty(), "unexpected row errors: {:?}", errors);
    drafts
}

#[test]
fn test_collection_sheet_to_approval() {
    // Declared 1,000,000 COP; one bag with twenty high 50,000 bills and a
    // document envelope holding one 250,000 check
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::default());

    let id = harness
        .transactions
        .seed("ORD-1001", TransactionKind::Collection, "COP");
    engine
        .create_collection(CreateCollection {
            tx: id,
            declared_total: Decimal::from(1_000_000),
            slip_number: Some("SLIP-77".to_string()),
            note: Some("morning route".to_string()),
            actor: 10,
        })
        .expect("create collection");

    let batch = drafts_from_sheet(&[
        "B1,bolsa,,,1000000,Maria Perez,CC-1019,billete,50000,,,20,0,20,50000,1000000,si,,",
        "S1,sobre,documento,B1,,,,cheque,,,,1,0,1,250000,250000,,CHK-88,001",
    ]);
    let totals = engine.save_containers(id, batch, 11).expect("save batch");
    assert_eq!(totals.bill_high, Decimal::from(1_000_000));
    assert_eq!(totals.bill_low, Decimal::ZERO);
    assert_eq!(totals.check, Decimal::from(250_000));
    assert_eq!(totals.bill_total(), Decimal::from(1_000_000));
    assert_eq!(totals.counted, Decimal::from(1_000_000));
    assert_eq!(totals.overall, Decimal::from(1_250_000));
    assert_eq!(totals.difference, Decimal::ZERO);

    // Conservation: container counted values sum to the overall total
    assert_eq!(
        harness.containers.sum_counted(id).unwrap(),
        totals.overall
    );

    // Envelope resolved to its parent bag in the stored tree
    let tree = harness.containers.load_tree(id).expect("tree");
    assert_eq!(tree.len(), 2);
    let bag_id = tree.iter().find(|c| c.code == "B1").unwrap().id;
    let envelope = tree.iter().find(|c| c.code == "S1").unwrap();
    assert_eq!(envelope.parent_id, Some(bag_id));

    engine.finalize(id, 11).expect("finalize");
    let tx = engine.approve(id, 12, Some("clean")).expect("approve");
    assert_eq!(tx.status, TransactionStatus::Aprobado);
    assert_eq!(tx.counted_total, Decimal::from(1_000_000));
    assert_eq!(tx.overall_total, Decimal::from(1_250_000));
    assert_eq!(tx.value_difference, Decimal::ZERO);
}

#[test]
fn test_provision_sheet_through_delivery() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::absolute(Decimal::from(1_000)));

    let tx = engine
        .create_provision(NewProvision {
            order_id: "ORD-2002".to_string(),
            currency: "COP".to_string(),
            slip_number: None,
            declared_bill: Decimal::from(900_000),
            declared_coin: Decimal::from(100_000),
            declared_document: Decimal::ZERO,
            registered_by: 10,
        })
        .expect("create provision");
    assert_eq!(tx.status, TransactionStatus::EncoladoParaConteo);

    let batch = drafts_from_sheet(&[
        "B1,bag,,,,,,bill,50000,,,18,0,18,50000,900000,si,,",
        "B1,bag,,,,,,coin,500,,,200,0,200,500,100000,,,",
    ]);
    let totals = engine.save_containers(tx.id, batch, 11).expect("save");
    assert_eq!(totals.counted, Decimal::from(1_000_000));
    assert_eq!(totals.declared_cash, Decimal::from(1_000_000));
    assert_eq!(totals.difference, Decimal::ZERO);

    engine.finalize(tx.id, 11).expect("finalize");
    let reviewed = engine.approve(tx.id, 12, None).expect("approve");
    assert_eq!(reviewed.status, TransactionStatus::ListoParaEntrega);

    let delivered = engine.deliver(tx.id, 20, 21).expect("deliver");
    assert_eq!(delivered.status, TransactionStatus::Entregado);
    assert_eq!(delivered.delivered_by, Some(20));
    assert_eq!(delivered.received_by, Some(21));
    assert!(delivered.delivered_at.is_some());
}

#[test]
fn test_provision_tolerance_gate_sits_at_approval() {
    // Declared 500,000, counted 480,000, 1% tolerance: the count closes,
    // the approval refuses the 20,000 gap against the 5,000 threshold
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::percent(Decimal::from(1)));

    let tx = engine
        .create_provision(NewProvision {
            order_id: "ORD-3003".to_string(),
            currency: "COP".to_string(),
            slip_number: None,
            declared_bill: Decimal::from(500_000),
            declared_coin: Decimal::ZERO,
            declared_document: Decimal::ZERO,
            registered_by: 10,
        })
        .expect("create provision");

    let batch = drafts_from_sheet(&["B1,bag,,,,,,bill,10000,,,48,0,48,10000,480000,,,"]);
    engine.save_containers(tx.id, batch, 11).expect("save");
    engine.finalize(tx.id, 11).expect("finalize passes");

    let error = engine.approve(tx.id, 12, None).expect_err("tolerance gate");
    match error {
        EngineError::ToleranceExceeded {
            declared,
            counted,
            gap,
            threshold,
            ..
        } => {
            assert_eq!(declared, Decimal::from(500_000));
            assert_eq!(counted, Decimal::from(480_000));
            assert_eq!(gap, Decimal::from(20_000));
            assert_eq!(threshold, Decimal::from(5_000));
        }
        other => panic!("expected ToleranceExceeded, got {other:?}"),
    }
    assert_eq!(
        harness.transactions.get(tx.id).unwrap().status,
        TransactionStatus::PendienteRevision
    );
}

#[test]
fn test_collection_tolerance_gate_sits_at_finalize() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::absolute(Decimal::from(5_000)));

    let id = harness
        .transactions
        .seed("ORD-4004", TransactionKind::Collection, "COP");
    engine
        .create_collection(CreateCollection {
            tx: id,
            declared_total: Decimal::from(1_000_000),
            slip_number: None,
            note: None,
            actor: 10,
        })
        .expect("create");

    let batch = drafts_from_sheet(&["B1,bag,,,,,,bill,10000,,,95,0,95,10000,950000,,,"]);
    engine.save_containers(id, batch, 11).expect("save");

    let error = engine.finalize(id, 11).expect_err("gap too wide");
    assert_eq!(error.kind(), ErrorKind::PolicyViolation);
    assert_eq!(
        harness.transactions.get(id).unwrap().status,
        TransactionStatus::Conteo
    );
}

#[test]
fn test_rejected_sheet_leaves_previous_count_standing() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::default());

    let id = harness
        .transactions
        .seed("ORD-5005", TransactionKind::Collection, "COP");
    engine
        .create_collection(CreateCollection {
            tx: id,
            declared_total: Decimal::from(100_000),
            slip_number: None,
            note: None,
            actor: 10,
        })
        .expect("create");

    let good = drafts_from_sheet(&["B1,bag,,,,,,bill,50000,,,2,0,2,50000,100000,si,,"]);
    engine.save_containers(id, good, 11).expect("first save");
    let commits = harness.unit_of_work.commit_count();

    // A cash envelope holding a check is refused by the content rule
    let bad = drafts_from_sheet(&[
        "B1,bag,,,,,,bill,50000,,,2,0,2,50000,100000,si,,",
        "S1,sobre,efectivo,B1,,,,cheque,,,,1,0,1,75000,75000,,CHK-1,002",
    ]);
    let error = engine.save_containers(id, bad, 11).expect_err("rejected");
    assert_eq!(error.rule_name(), Some("EnvelopeContent"));

    assert_eq!(harness.containers.detail_count(id).unwrap(), 1);
    assert_eq!(harness.unit_of_work.commit_count(), commits);
    assert_eq!(
        harness.transactions.get(id).unwrap().counted_total,
        Decimal::from(100_000)
    );
}

#[test]
fn test_approved_shortage_closes_the_gap() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::absolute(Decimal::from(100_000)));

    let id = harness
        .transactions
        .seed("ORD-6006", TransactionKind::Collection, "COP");
    engine
        .create_collection(CreateCollection {
            tx: id,
            declared_total: Decimal::from(1_000_000),
            slip_number: None,
            note: None,
            actor: 10,
        })
        .expect("create");

    let batch = drafts_from_sheet(&["B1,bag,,,,,,bill,50000,,,19,0,19,50000,950000,si,,"]);
    engine.save_containers(id, batch, 11).expect("save");
    assert_eq!(
        harness.transactions.get(id).unwrap().value_difference,
        Decimal::from(-50_000)
    );

    let bag_id = harness.containers.load_tree(id).unwrap()[0].id;
    let incident = engine
        .report_incident(NewIncident {
            transaction_id: id,
            owner: IncidentOwner::Container(bag_id),
            category: IncidentCategory::Overage,
            amount: IncidentAmount::Denominated {
                denomination: Decimal::from(50_000),
                quantity: 1,
            },
            description: "loose bill under the seal".to_string(),
            reported_by: 11,
        })
        .expect("report");
    assert_eq!(incident.status, IncidentStatus::Reported);
    assert_eq!(incident.amount, Decimal::from(50_000));

    let (decided, totals) = engine
        .review_incident(incident.id, IncidentDecision::Approve, 12)
        .expect("decide");
    assert_eq!(decided.status, IncidentStatus::Approved);
    assert_eq!(totals.incident_adjustment, Decimal::from(50_000));
    assert_eq!(totals.difference, Decimal::ZERO);

    let ledger = harness.incidents.incidents_for(id).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].reviewed_by, Some(12));
}

#[test]
fn test_totals_csv_matches_engine_output() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::default());

    let id = harness
        .transactions
        .seed("ORD-7007", TransactionKind::Collection, "COP");
    engine
        .create_collection(CreateCollection {
            tx: id,
            declared_total: Decimal::from(120_000),
            slip_number: None,
            note: None,
            actor: 10,
        })
        .expect("create");

    let batch = drafts_from_sheet(&[
        "B1,bag,,,,,,bill,100000,,,1,0,1,100000,100000,si,,",
        "B1,bag,,,,,,coin,1000,,,20,0,20,1000,20000,,,",
    ]);
    let totals = engine.save_containers(id, batch, 11).expect("save");

    let mut output = NamedTempFile::new().expect("temp file");
    write_totals_csv(&totals, output.as_file_mut()).expect("write totals");
    output.rewind().expect("rewind");
    let mut text = String::new();
    output.read_to_string(&mut text).expect("read back");

    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("bill_high,"));
    assert_eq!(
        lines.next().unwrap(),
        "100000,0,20000,0,0,120000,120000,120000,0,0"
    );
}

#[test]
fn test_cancelled_transaction_is_absorbing() {
    let harness = Harness::new();
    let engine = harness.engine(TolerancePolicy::default());

    let id = harness
        .transactions
        .seed("ORD-8008", TransactionKind::Collection, "COP");
    let tx = engine.cancel(id, 13, "route aborted").expect("cancel");
    assert_eq!(tx.status, TransactionStatus::Cancelado);

    let error = engine
        .save_containers(id, Vec::new(), 11)
        .expect_err("frozen");
    assert!(matches!(error, EngineError::ContainersFrozen { .. }));
    let error = engine.finalize(id, 11).expect_err("terminal");
    assert!(matches!(error, EngineError::TerminalStatus { .. }));
}
