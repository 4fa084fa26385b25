//! Transaction-related types for the reconciliation engine
//!
//! This module defines the cash transaction entity, its kind (collection or
//! provision) and the closed status set that drives the lifecycle state
//! machine in [`crate::core::state_machine`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier
///
/// Supports transaction IDs from 0 to 4,294,967,295
pub type TransactionId = u32;

/// Back-office user identifier (registrar, reviewer, deliverer, receiver)
pub type ActorId = u32;

/// Kind of cash movement a transaction represents
///
/// The kind decides the declared-cash baseline used during reconciliation
/// and the path the review approval takes: collections land directly on
/// `Aprobado`, provisions detour through `ListoParaEntrega` and `Entregado`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Cash picked up from a client and brought in for counting
    Collection,

    /// Cash prepared in-house for delivery to a client
    Provision,
}

impl TransactionKind {
    /// The pre-operational status a transaction of this kind starts in
    ///
    /// Collection transactions are created alongside their service order in
    /// `RegistroTesoreria`; provision transactions start in
    /// `ProvisionEnProceso`.
    pub fn initial_status(self) -> TransactionStatus {
        match self {
            TransactionKind::Collection => TransactionStatus::RegistroTesoreria,
            TransactionKind::Provision => TransactionStatus::ProvisionEnProceso,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Collection => write!(f, "collection"),
            TransactionKind::Provision => write!(f, "provision"),
        }
    }
}

/// Lifecycle status of a cash transaction
///
/// This is a closed set: every status comparison in the engine is an
/// exhaustive match, and the allowed edges between statuses live in a single
/// successor table (see [`crate::core::state_machine`]).
///
/// `Aprobado`, `Rechazado` and `Cancelado` are terminal: once reached, no
/// further transition is ever accepted. `Entregado` has no successors either,
/// but is only reachable for provision transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Pre-operational status of a collection, set when the service order
    /// is registered by treasury
    RegistroTesoreria,

    /// Pre-operational status of a provision being prepared
    ProvisionEnProceso,

    /// Declared values are set and the transaction waits for a counting desk
    EncoladoParaConteo,

    /// Physical counting in progress; container batches may be replaced
    Conteo,

    /// Counting finished; waiting for a reviewer's decision
    PendienteRevision,

    /// Reviewer accepted the count (terminal)
    Aprobado,

    /// Reviewer rejected the count (terminal)
    Rechazado,

    /// Provision approved by review, physical delivery still pending
    ListoParaEntrega,

    /// Provision handed over to the client
    Entregado,

    /// Abandoned before reaching a decision (terminal, reachable from any
    /// non-terminal status)
    Cancelado,
}

impl TransactionStatus {
    /// Whether this status accepts no further transitions, ever
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Aprobado
                | TransactionStatus::Rechazado
                | TransactionStatus::Cancelado
        )
    }

    /// Whether container batches may still be saved in this status
    ///
    /// The container tree is frozen once the transaction reaches
    /// `PendienteRevision`.
    pub fn is_countable(self) -> bool {
        matches!(
            self,
            TransactionStatus::EncoladoParaConteo | TransactionStatus::Conteo
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::RegistroTesoreria => "RegistroTesoreria",
            TransactionStatus::ProvisionEnProceso => "ProvisionEnProceso",
            TransactionStatus::EncoladoParaConteo => "EncoladoParaConteo",
            TransactionStatus::Conteo => "Conteo",
            TransactionStatus::PendienteRevision => "PendienteRevision",
            TransactionStatus::Aprobado => "Aprobado",
            TransactionStatus::Rechazado => "Rechazado",
            TransactionStatus::ListoParaEntrega => "ListoParaEntrega",
            TransactionStatus::Entregado => "Entregado",
            TransactionStatus::Cancelado => "Cancelado",
        };
        write!(f, "{}", name)
    }
}

/// One cash movement event
///
/// A transaction is created alongside its parent service order and is never
/// physically deleted; its status moves to a terminal value instead. The
/// `counted_total`, `overall_total`, `incident_adjustment` and
/// `value_difference` fields are derived and only ever written by the
/// aggregation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Transaction identifier
    pub id: TransactionId,

    /// The service order this transaction belongs to (exactly one)
    pub order_id: String,

    /// Collection or provision
    pub kind: TransactionKind,

    /// ISO 4217 currency code, e.g. "COP"
    pub currency: String,

    /// Human-legible slip number from the paper trail
    pub slip_number: Option<String>,

    /// Declared cash total for a collection (what the client claims to send)
    pub declared_total: Decimal,

    /// Declared bill portion for a provision
    pub declared_bill: Decimal,

    /// Declared coin portion for a provision
    pub declared_coin: Decimal,

    /// Declared document portion, informational only: documents are never
    /// part of the declared cash baseline
    pub declared_document: Decimal,

    /// Derived: sum of bill and coin amounts across all containers
    pub counted_total: Decimal,

    /// Derived: counted plus check and document amounts
    pub overall_total: Decimal,

    /// Derived: signed sum of approved incident effects
    pub incident_adjustment: Decimal,

    /// Derived: (counted - declared cash) + incident adjustment
    pub value_difference: Decimal,

    /// Free-text informative note, appended to by review and cancellation
    pub note: Option<String>,

    /// Current lifecycle status
    pub status: TransactionStatus,

    /// Who set the declared values and queued the transaction for counting
    pub registered_by: Option<ActorId>,

    /// When the transaction was queued for counting
    pub registered_at: Option<DateTime<Utc>>,

    /// Who took the review decision
    pub reviewed_by: Option<ActorId>,

    /// When counting formally ended (stamped with the review decision)
    pub counting_ended_at: Option<DateTime<Utc>>,

    /// Who handed the provision over
    pub delivered_by: Option<ActorId>,

    /// Who received the provision; must differ from the deliverer
    pub received_by: Option<ActorId>,

    /// When the provision was handed over
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a transaction in its pre-operational status
    ///
    /// All declared and derived amounts start at zero; declared values are
    /// set later by the orchestrator's create use cases.
    pub fn new(
        id: TransactionId,
        order_id: impl Into<String>,
        kind: TransactionKind,
        currency: impl Into<String>,
    ) -> Self {
        Transaction {
            id,
            order_id: order_id.into(),
            kind,
            currency: currency.into(),
            slip_number: None,
            declared_total: Decimal::ZERO,
            declared_bill: Decimal::ZERO,
            declared_coin: Decimal::ZERO,
            declared_document: Decimal::ZERO,
            counted_total: Decimal::ZERO,
            overall_total: Decimal::ZERO,
            incident_adjustment: Decimal::ZERO,
            value_difference: Decimal::ZERO,
            note: None,
            status: kind.initial_status(),
            registered_by: None,
            registered_at: None,
            reviewed_by: None,
            counting_ended_at: None,
            delivered_by: None,
            received_by: None,
            delivered_at: None,
        }
    }

    /// The declared cash baseline used for the difference calculation
    ///
    /// Collections declare a single cash total; provisions declare bill and
    /// coin portions independently. Checks and documents are never part of
    /// the baseline for either kind.
    pub fn declared_cash(&self) -> Decimal {
        match self.kind {
            TransactionKind::Collection => self.declared_total,
            TransactionKind::Provision => self.declared_bill + self.declared_coin,
        }
    }

    /// Append a line to the informative note
    pub fn append_note(&mut self, line: &str) {
        match &mut self.note {
            Some(note) => {
                note.push('\n');
                note.push_str(line);
            }
            None => self.note = Some(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::collection(TransactionKind::Collection, TransactionStatus::RegistroTesoreria)]
    #[case::provision(TransactionKind::Provision, TransactionStatus::ProvisionEnProceso)]
    fn test_initial_status(#[case] kind: TransactionKind, #[case] expected: TransactionStatus) {
        assert_eq!(kind.initial_status(), expected);
        assert_eq!(Transaction::new(1, "ORD-1", kind, "COP").status, expected);
    }

    #[rstest]
    #[case::aprobado(TransactionStatus::Aprobado, true)]
    #[case::rechazado(TransactionStatus::Rechazado, true)]
    #[case::cancelado(TransactionStatus::Cancelado, true)]
    #[case::entregado(TransactionStatus::Entregado, false)]
    #[case::conteo(TransactionStatus::Conteo, false)]
    #[case::pendiente(TransactionStatus::PendienteRevision, false)]
    fn test_is_terminal(#[case] status: TransactionStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case::queued(TransactionStatus::EncoladoParaConteo, true)]
    #[case::counting(TransactionStatus::Conteo, true)]
    #[case::pending(TransactionStatus::PendienteRevision, false)]
    #[case::initial(TransactionStatus::RegistroTesoreria, false)]
    fn test_is_countable(#[case] status: TransactionStatus, #[case] countable: bool) {
        assert_eq!(status.is_countable(), countable);
    }

    #[test]
    fn test_declared_cash_baseline_by_kind() {
        let mut tx = Transaction::new(1, "ORD-1", TransactionKind::Collection, "COP");
        tx.declared_total = Decimal::from(1_000_000);
        tx.declared_bill = Decimal::from(700_000);
        tx.declared_coin = Decimal::from(50_000);
        tx.declared_document = Decimal::from(30_000);
        assert_eq!(tx.declared_cash(), Decimal::from(1_000_000));

        tx.kind = TransactionKind::Provision;
        assert_eq!(tx.declared_cash(), Decimal::from(750_000));
    }

    #[test]
    fn test_append_note() {
        let mut tx = Transaction::new(1, "ORD-1", TransactionKind::Collection, "COP");
        tx.append_note("first");
        tx.append_note("second");
        assert_eq!(tx.note.as_deref(), Some("first\nsecond"));
    }
}
