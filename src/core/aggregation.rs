//! Aggregation engine
//!
//! The single place where a transaction's totals are computed, consumed by
//! both the write path (after every container save and incident decision)
//! and any read-only summary. Walks the container tree, splits bill amounts
//! by the per-detail high-denomination flag, applies approved incident
//! effects and persists the derived fields on the transaction.
//!
//! Recalculation is idempotent: with unchanged containers and incidents,
//! two passes produce identical totals and leave the transaction row as the
//! first pass did.

use crate::core::traits::{ContainerStore, IncidentStore, TransactionStore};
use crate::types::{Container, EngineError, Totals, Transaction, TransactionId, ValueType};
use rust_decimal::Decimal;

/// Compute totals from an already-loaded tree and incident effect
///
/// Pure function: no I/O, no mutation. `incident_effect` is the signed sum
/// of approved incident effects for the transaction.
pub fn compute_totals(
    tx: &Transaction,
    containers: &[Container],
    incident_effect: Decimal,
) -> Totals {
    let mut totals = Totals {
        declared_cash: tx.declared_cash(),
        incident_adjustment: incident_effect,
        ..Totals::default()
    };

    for container in containers {
        for detail in &container.details {
            match detail.value_type {
                ValueType::Bill => {
                    if detail.is_high_denomination {
                        totals.bill_high += detail.amount;
                    } else {
                        totals.bill_low += detail.amount;
                    }
                }
                ValueType::Coin => totals.coin += detail.amount,
                ValueType::Check => totals.check += detail.amount,
                ValueType::Document => totals.document += detail.amount,
            }
        }
    }

    totals.counted = totals.bill_high + totals.bill_low + totals.coin;
    totals.overall = totals.counted + totals.check + totals.document;
    totals.difference = (totals.counted - totals.declared_cash) + totals.incident_adjustment;
    totals
}

/// Recalculate and persist a transaction's derived totals
///
/// Loads the full container tree and the approved incident effect, computes
/// the totals and writes the four derived fields back on the transaction
/// row. Containers are never mutated.
///
/// # Errors
///
/// Returns [`EngineError::TransactionNotFound`] for unknown transactions,
/// or a store error.
pub fn recalculate<T, C, I>(
    transactions: &T,
    containers: &C,
    incidents: &I,
    tx_id: TransactionId,
) -> Result<Totals, EngineError>
where
    T: TransactionStore,
    C: ContainerStore,
    I: IncidentStore,
{
    let tx = transactions.get(tx_id)?;
    let tree = containers.load_tree(tx_id)?;
    let incident_effect = incidents.sum_approved_effect(tx_id)?;

    let totals = compute_totals(&tx, &tree, incident_effect);

    transactions.update(tx_id, |tx| {
        tx.counted_total = totals.counted;
        tx.overall_total = totals.overall;
        tx.incident_adjustment = totals.incident_adjustment;
        tx.value_difference = totals.difference;
        Ok(())
    })?;

    Ok(totals)
}
