//! Recalculated totals of a transaction
//!
//! `Totals` is the output of one aggregation pass: per-type sums broken out
//! by denomination class, the counted and overall totals derived from them,
//! and the signed difference against the declared cash baseline.

use rust_decimal::Decimal;
use serde::Serialize;

/// Per-type sums and derived totals for one transaction
///
/// Conservation invariants, checked by the aggregation engine's tests:
/// `counted = bill_high + bill_low + coin` and
/// `overall = counted + check + document`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    /// Bills flagged as high denomination
    pub bill_high: Decimal,

    /// Bills not flagged as high denomination
    pub bill_low: Decimal,

    /// All coin lines
    pub coin: Decimal,

    /// All check lines
    pub check: Decimal,

    /// All document lines
    pub document: Decimal,

    /// Counted cash: bills plus coins
    pub counted: Decimal,

    /// Counted cash plus checks and documents
    pub overall: Decimal,

    /// Declared cash baseline for the transaction's kind
    pub declared_cash: Decimal,

    /// Signed sum of approved incident effects
    pub incident_adjustment: Decimal,

    /// `(counted - declared_cash) + incident_adjustment`
    pub difference: Decimal,
}

impl Totals {
    /// Total of all bill lines, both denomination classes
    pub fn bill_total(&self) -> Decimal {
        self.bill_high + self.bill_low
    }
}
