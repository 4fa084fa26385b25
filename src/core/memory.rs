//! In-memory store implementations
//!
//! `DashMap`-backed implementations of the persistence seams, used by the
//! CLI and the integration tests. The concurrent maps serialize conflicting
//! writes to the same transaction, which is exactly the guarantee the
//! orchestrator expects from a real store; correctness never relies on
//! in-process locking above this layer.

use crate::core::traits::{
    ContainerStore, IncidentStore, NewIncident, NewProvision, TransactionStore, UnitOfWork,
};
use crate::types::{
    ActorId, Container, ContainerDraft, ContainerId, ContainerStatus, DetailId, EngineError,
    Incident, IncidentId, IncidentStatus, Transaction, TransactionId, TransactionKind,
    ValueDetail,
};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// In-memory transaction rows
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    rows: DashMap<TransactionId, Transaction>,
    next_id: AtomicU32,
}

impl MemoryTransactionStore {
    /// An empty store
    pub fn new() -> Self {
        MemoryTransactionStore {
            rows: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Seed the pre-operational transaction row that the back office
    /// creates alongside a service order
    ///
    /// Returns the new transaction id. Collections must be seeded before
    /// the orchestrator's create use case can link to them.
    pub fn seed(
        &self,
        order_id: impl Into<String>,
        kind: TransactionKind,
        currency: impl Into<String>,
    ) -> TransactionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows
            .insert(id, Transaction::new(id, order_id, kind, currency));
        id
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get(&self, tx: TransactionId) -> Result<Transaction, EngineError> {
        self.rows
            .get(&tx)
            .map(|row| row.clone())
            .ok_or(EngineError::TransactionNotFound { tx })
    }

    fn update<F>(&self, tx: TransactionId, f: F) -> Result<Transaction, EngineError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), EngineError>,
    {
        let mut row = self
            .rows
            .get_mut(&tx)
            .ok_or(EngineError::TransactionNotFound { tx })?;
        f(row.value_mut())?;
        Ok(row.clone())
    }

    fn add_provision(&self, args: NewProvision) -> Result<TransactionId, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut tx = Transaction::new(id, args.order_id, TransactionKind::Provision, args.currency);
        tx.slip_number = args.slip_number;
        tx.declared_bill = args.declared_bill;
        tx.declared_coin = args.declared_coin;
        tx.declared_document = args.declared_document;
        tx.registered_by = Some(args.registered_by);
        tx.registered_at = Some(Utc::now());
        self.rows.insert(id, tx);
        Ok(id)
    }
}

/// In-memory container trees, replaced wholesale per save
#[derive(Debug, Default)]
pub struct MemoryContainerStore {
    trees: DashMap<TransactionId, Vec<Container>>,
    next_container: AtomicU32,
    next_detail: AtomicU32,
}

impl MemoryContainerStore {
    /// An empty store
    pub fn new() -> Self {
        MemoryContainerStore {
            trees: DashMap::new(),
            next_container: AtomicU32::new(1),
            next_detail: AtomicU32::new(1),
        }
    }
}

impl ContainerStore for MemoryContainerStore {
    fn replace_tree(
        &self,
        tx: TransactionId,
        batch: Vec<ContainerDraft>,
        _actor: ActorId,
    ) -> Result<Vec<Container>, EngineError> {
        // Two passes: ids first so parent codes can resolve forward or
        // backward within the batch.
        let mut ids_by_code: HashMap<String, ContainerId> = HashMap::new();
        let mut assigned: Vec<ContainerId> = Vec::with_capacity(batch.len());
        for draft in &batch {
            let id = self.next_container.fetch_add(1, Ordering::SeqCst);
            ids_by_code.insert(draft.code.clone(), id);
            assigned.push(id);
        }

        let mut tree = Vec::with_capacity(batch.len());
        for (draft, id) in batch.into_iter().zip(assigned) {
            let parent_id = match &draft.parent_code {
                Some(parent) => Some(*ids_by_code.get(parent).ok_or_else(|| {
                    EngineError::orphan_parent(&draft.code, parent)
                })?),
                None => None,
            };

            let details: Vec<ValueDetail> = draft
                .details
                .into_iter()
                .map(|d| ValueDetail {
                    id: self.next_detail.fetch_add(1, Ordering::SeqCst) as DetailId,
                    container_id: id,
                    value_type: d.value_type,
                    denomination: d.denomination,
                    quality: d.quality,
                    quantity: d.quantity,
                    bundle_count: d.bundle_count,
                    loose_count: d.loose_count,
                    unit_value: d.unit_value,
                    amount: d.amount,
                    is_high_denomination: d.is_high_denomination,
                    check_number: d.check_number,
                    bank_code: d.bank_code,
                })
                .collect();

            let counted_value: Decimal = details.iter().map(|d| d.amount).sum();
            let status = if details.is_empty() {
                ContainerStatus::Registered
            } else {
                ContainerStatus::Counted
            };

            tree.push(Container {
                id,
                transaction_id: tx,
                code: draft.code,
                kind: draft.kind,
                envelope_kind: draft.envelope_kind,
                parent_id,
                status,
                declared_value: draft.declared_value,
                counted_value,
                cashier_name: draft.cashier_name,
                cashier_document: draft.cashier_document,
                details,
            });
        }

        self.trees.insert(tx, tree.clone());
        Ok(tree)
    }

    fn load_tree(&self, tx: TransactionId) -> Result<Vec<Container>, EngineError> {
        Ok(self.trees.get(&tx).map(|t| t.clone()).unwrap_or_default())
    }

    fn sum_counted(&self, tx: TransactionId) -> Result<Decimal, EngineError> {
        Ok(self
            .load_tree(tx)?
            .iter()
            .map(|container| container.counted_value)
            .sum())
    }

    fn detail_count(&self, tx: TransactionId) -> Result<usize, EngineError> {
        Ok(self
            .load_tree(tx)?
            .iter()
            .map(|container| container.details.len())
            .sum())
    }
}

/// In-memory incident ledger
#[derive(Debug, Default)]
pub struct MemoryIncidentStore {
    rows: DashMap<IncidentId, Incident>,
    next_id: AtomicU32,
}

impl MemoryIncidentStore {
    /// An empty store
    pub fn new() -> Self {
        MemoryIncidentStore {
            rows: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }
}

impl IncidentStore for MemoryIncidentStore {
    fn record(&self, incident: NewIncident) -> Result<Incident, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = Incident {
            id,
            transaction_id: incident.transaction_id,
            owner: incident.owner,
            category: incident.category,
            amount: incident.amount.resolve(),
            description: incident.description,
            reported_by: incident.reported_by,
            reported_at: Utc::now(),
            status: IncidentStatus::Reported,
            reviewed_by: None,
        };
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    fn update<F>(&self, incident: IncidentId, f: F) -> Result<Incident, EngineError>
    where
        F: FnOnce(&mut Incident) -> Result<(), EngineError>,
    {
        let mut row = self
            .rows
            .get_mut(&incident)
            .ok_or(EngineError::incident_not_found(incident))?;
        f(row.value_mut())?;
        Ok(row.clone())
    }

    fn sum_approved_effect(&self, tx: TransactionId) -> Result<Decimal, EngineError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.transaction_id == tx && row.status == IncidentStatus::Approved)
            .map(|row| row.signed_effect())
            .sum())
    }

    fn incidents_for(&self, tx: TransactionId) -> Result<Vec<Incident>, EngineError> {
        let mut incidents: Vec<Incident> = self
            .rows
            .iter()
            .filter(|row| row.transaction_id == tx)
            .map(|row| row.clone())
            .collect();
        incidents.sort_by_key(|incident| incident.id);
        Ok(incidents)
    }
}

/// Commit-counting unit of work
///
/// The in-memory stores are durable as soon as they are written, so commit
/// only counts invocations; tests use the counter to assert that every use
/// case commits exactly once.
#[derive(Debug, Default)]
pub struct MemoryUnitOfWork {
    commits: AtomicU32,
}

impl MemoryUnitOfWork {
    /// A unit of work with zero commits
    pub fn new() -> Self {
        MemoryUnitOfWork {
            commits: AtomicU32::new(0),
        }
    }

    /// Number of commits so far
    pub fn commit_count(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    fn commit(&self) -> Result<(), EngineError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerKind, EnvelopeKind, ValueDetailDraft, ValueType};

    fn bill_line(amount: i64) -> ValueDetailDraft {
        ValueDetailDraft {
            value_type: ValueType::Bill,
            denomination: Some(Decimal::from(amount)),
            bundle_size: None,
            quality: None,
            quantity: 1,
            bundle_count: 0,
            loose_count: 1,
            unit_value: Decimal::from(amount),
            amount: Decimal::from(amount),
            is_high_denomination: false,
            check_number: None,
            bank_code: None,
        }
    }

    #[test]
    fn test_replace_tree_resolves_parents_and_derives_counted() {
        let store = MemoryContainerStore::new();
        let mut bag = ContainerDraft::bag("B1");
        bag.details.push(bill_line(100_000));
        let mut envelope = ContainerDraft::envelope("S1", EnvelopeKind::Cash, "B1");
        envelope.details.push(bill_line(50_000));

        let tree = store.replace_tree(1, vec![bag, envelope], 7).unwrap();
        assert_eq!(tree.len(), 2);
        let b1 = &tree[0];
        let s1 = &tree[1];
        assert_eq!(b1.kind, ContainerKind::Bag);
        assert_eq!(s1.parent_id, Some(b1.id));
        assert_eq!(b1.counted_value, Decimal::from(100_000));
        assert_eq!(s1.status, ContainerStatus::Counted);

        assert_eq!(store.sum_counted(1).unwrap(), Decimal::from(150_000));
        assert_eq!(store.detail_count(1).unwrap(), 2);
    }

    #[test]
    fn test_replace_tree_is_wholesale() {
        let store = MemoryContainerStore::new();
        let mut first = ContainerDraft::bag("B1");
        first.details.push(bill_line(100_000));
        store.replace_tree(1, vec![first], 7).unwrap();

        let second = ContainerDraft::bag("B2");
        store.replace_tree(1, vec![second], 7).unwrap();

        let tree = store.load_tree(1).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].code, "B2");
        assert_eq!(store.detail_count(1).unwrap(), 0);
    }

    #[test]
    fn test_transaction_store_update_and_not_found() {
        let store = MemoryTransactionStore::new();
        let id = store.seed("ORD-1", TransactionKind::Collection, "COP");

        let updated = store
            .update(id, |tx| {
                tx.declared_total = Decimal::from(42);
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.declared_total, Decimal::from(42));

        let err = store.get(id + 100).unwrap_err();
        assert!(matches!(err, EngineError::TransactionNotFound { .. }));
    }

    #[test]
    fn test_incident_store_sums_only_approved() {
        use crate::types::{IncidentAmount, IncidentCategory, IncidentOwner};
        let store = MemoryIncidentStore::new();
        let shortage = store
            .record(NewIncident {
                transaction_id: 1,
                owner: IncidentOwner::Container(1),
                category: IncidentCategory::Shortage,
                amount: IncidentAmount::Direct(Decimal::from(10_000)),
                description: "short".to_string(),
                reported_by: 7,
            })
            .unwrap();
        store
            .record(NewIncident {
                transaction_id: 1,
                owner: IncidentOwner::Container(1),
                category: IncidentCategory::Overage,
                amount: IncidentAmount::Direct(Decimal::from(99_000)),
                description: "over, never approved".to_string(),
                reported_by: 7,
            })
            .unwrap();

        assert_eq!(store.sum_approved_effect(1).unwrap(), Decimal::ZERO);

        store
            .update(shortage.id, |incident| {
                incident.status = IncidentStatus::Approved;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.sum_approved_effect(1).unwrap(), Decimal::from(-10_000));
    }
}
