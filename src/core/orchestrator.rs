//! Transaction orchestrator
//!
//! The use-case layer of the engine. Each operation follows the same shape:
//! load the transaction, consult the policy set for admissibility, mutate
//! through the store seams, recompute totals where container or incident
//! state changed, validate and apply the status transition, commit the unit
//! of work exactly once, and emit an audit event.
//!
//! All validation happens before any write: a rejected container batch
//! leaves the previous tree untouched.

use crate::core::aggregation;
use crate::core::state_machine;
use crate::core::traits::{
    AuditEvent, AuditSink, ContainerStore, IncidentStore, NewIncident, NewProvision,
    ServiceOrderSync, TransactionStore, UnitOfWork,
};
use crate::policy::{AllowedValueTypesPolicy, PolicySet};
use crate::types::{
    ActorId, ContainerDraft, ContainerKind, EngineError, Incident, IncidentStatus, Totals,
    Transaction, TransactionId, TransactionKind, TransactionStatus,
};
use chrono::Utc;
use std::collections::HashMap;

/// Command for linking declared values onto a pre-existing collection row
#[derive(Debug, Clone)]
pub struct CreateCollection {
    /// The transaction row created alongside the service order
    pub tx: TransactionId,

    /// Declared cash total claimed by the client
    pub declared_total: rust_decimal::Decimal,

    /// Slip number from the paper trail
    pub slip_number: Option<String>,

    /// Initial informative note
    pub note: Option<String>,

    /// Who is registering the collection
    pub actor: ActorId,
}

/// Decision taken on a reported incident
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentDecision {
    /// The discrepancy stands; its signed effect enters the difference
    Approve,

    /// The discrepancy is dismissed
    Reject,
}

/// Composes policies, stores, the state machine and the aggregation engine
/// into the engine's use cases
pub struct Orchestrator<T, C, I, U, A, O> {
    transactions: T,
    containers: C,
    incidents: I,
    unit_of_work: U,
    audit: A,
    orders: O,
    policies: PolicySet,
}

impl<T, C, I, U, A, O> Orchestrator<T, C, I, U, A, O>
where
    T: TransactionStore,
    C: ContainerStore,
    I: IncidentStore,
    U: UnitOfWork,
    A: AuditSink,
    O: ServiceOrderSync,
{
    /// Wire an orchestrator from its collaborators and policy set
    pub fn new(
        transactions: T,
        containers: C,
        incidents: I,
        unit_of_work: U,
        audit: A,
        orders: O,
        policies: PolicySet,
    ) -> Self {
        Orchestrator {
            transactions,
            containers,
            incidents,
            unit_of_work,
            audit,
            orders,
            policies,
        }
    }

    /// Register a collection for counting
    ///
    /// Links declared values onto the transaction row created alongside the
    /// service order and queues it for counting.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist, the counting policy
    /// rejects the order/currency/declared-total triple, or the row is not
    /// in its pre-operational status.
    pub fn create_collection(&self, cmd: CreateCollection) -> Result<Transaction, EngineError> {
        let tx = self.transactions.get(cmd.tx)?;
        self.policies
            .counting
            .can_create(tx.id, &tx.order_id, &tx.currency, cmd.declared_total)?;
        state_machine::ensure_can_move(
            tx.status,
            TransactionStatus::EncoladoParaConteo,
            tx.id,
        )?;

        let updated = self.transactions.update(cmd.tx, |tx| {
            tx.declared_total = cmd.declared_total;
            tx.slip_number = cmd.slip_number.clone();
            if let Some(note) = &cmd.note {
                tx.append_note(note);
            }
            tx.registered_by = Some(cmd.actor);
            tx.registered_at = Some(Utc::now());
            tx.status = TransactionStatus::EncoladoParaConteo;
            Ok(())
        })?;

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.collection_created",
            &updated,
            format!("collection queued for counting, declared {}", updated.declared_total),
        );
        Ok(updated)
    }

    /// Register a provision for counting
    ///
    /// Creates the provision row and queues it for counting in one use case.
    ///
    /// # Errors
    ///
    /// Fails when the counting policy rejects the order, currency or the
    /// declared bill-plus-coin total.
    pub fn create_provision(&self, args: NewProvision) -> Result<Transaction, EngineError> {
        let declared = args.declared_bill + args.declared_coin;
        // The id is not known yet; 0 stands for "not yet assigned" in the
        // policy's error reporting.
        self.policies
            .counting
            .can_create(0, &args.order_id, &args.currency, declared)?;

        let id = self.transactions.add_provision(args)?;
        let updated = self.transactions.update(id, |tx| {
            state_machine::ensure_can_move(
                tx.status,
                TransactionStatus::EncoladoParaConteo,
                tx.id,
            )?;
            tx.status = TransactionStatus::EncoladoParaConteo;
            Ok(())
        })?;

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.provision_created",
            &updated,
            format!("provision queued for counting, declared {}", updated.declared_cash()),
        );
        Ok(updated)
    }

    /// Replace the transaction's container tree with a counted batch
    ///
    /// Validates every container and value detail against the envelope and
    /// allowed-value-types policies and the structural invariants before
    /// any write. The first batch carrying a value detail advances the
    /// transaction from `EncoladoParaConteo` to `Conteo`. Always ends by
    /// recalculating totals.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist, the tree is frozen (the
    /// transaction is past counting), a policy rejects a line, or a
    /// structural invariant (duplicate code, orphan parent, non-bag parent,
    /// nesting bound, amount or quantity mismatch) is violated. On failure
    /// nothing is persisted.
    pub fn save_containers(
        &self,
        tx_id: TransactionId,
        batch: Vec<ContainerDraft>,
        actor: ActorId,
    ) -> Result<Totals, EngineError> {
        let tx = self.transactions.get(tx_id)?;
        if !tx.status.is_countable() {
            return Err(EngineError::ContainersFrozen {
                tx: tx_id,
                status: tx.status,
            });
        }

        self.validate_batch(&tx, &batch)?;

        let has_details = batch.iter().any(|c| !c.details.is_empty());
        self.containers.replace_tree(tx_id, batch, actor)?;

        let mut resulting = tx.clone();
        if tx.status == TransactionStatus::EncoladoParaConteo && has_details {
            state_machine::ensure_can_move(tx.status, TransactionStatus::Conteo, tx_id)?;
            resulting = self.transactions.update(tx_id, |tx| {
                tx.status = TransactionStatus::Conteo;
                Ok(())
            })?;
        }

        let totals = self.recalculate(tx_id)?;
        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.containers_saved",
            &resulting,
            format!("containers saved, counted {}", totals.counted),
        );
        Ok(totals)
    }

    /// Close the count and hand the transaction to review
    ///
    /// Collections must pass the tolerance gate here; for provisions the
    /// tolerance check is deferred to review approval.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist, has no value details, is
    /// not in `Conteo`, or (collections only) the counted-vs-declared gap
    /// exceeds the tolerance.
    pub fn finalize(&self, tx_id: TransactionId, actor: ActorId) -> Result<Transaction, EngineError> {
        let tx = self.transactions.get(tx_id)?;
        state_machine::ensure_can_move(tx.status, TransactionStatus::PendienteRevision, tx_id)?;

        let detail_count = self.containers.detail_count(tx_id)?;
        self.policies.counting.can_finalize(tx_id, detail_count)?;

        if tx.kind == TransactionKind::Collection {
            self.policies
                .tolerance
                .check(tx_id, tx.declared_cash(), tx.counted_total)?;
        }

        let updated = self.transactions.update(tx_id, |tx| {
            tx.status = TransactionStatus::PendienteRevision;
            Ok(())
        })?;

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.finalized",
            &updated,
            format!(
                "count finalized by {}, counted {}, difference {}",
                actor, updated.counted_total, updated.value_difference
            ),
        );
        Ok(updated)
    }

    /// Apply the reviewer's approval
    ///
    /// Collections land on `Aprobado` (terminal) and nudge the parent
    /// order. Provisions pass the deferred tolerance gate and land on
    /// `ListoParaEntrega`, with delivery still pending. Either way the
    /// reviewer and the counting-end time are stamped.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist, is not in
    /// `PendienteRevision`, or (provisions only) the counted-vs-declared
    /// gap exceeds the tolerance.
    pub fn approve(
        &self,
        tx_id: TransactionId,
        reviewer: ActorId,
        observations: Option<&str>,
    ) -> Result<Transaction, EngineError> {
        let tx = self.transactions.get(tx_id)?;
        let target = match tx.kind {
            TransactionKind::Collection => TransactionStatus::Aprobado,
            TransactionKind::Provision => TransactionStatus::ListoParaEntrega,
        };
        state_machine::ensure_can_move(tx.status, target, tx_id)?;

        if tx.kind == TransactionKind::Provision {
            self.policies
                .tolerance
                .check(tx_id, tx.declared_cash(), tx.counted_total)?;
        }

        let updated = self.apply_review(tx_id, target, reviewer, observations)?;
        if target == TransactionStatus::Aprobado {
            self.orders.advance(&updated.order_id, updated.status);
        }

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.review_approved",
            &updated,
            format!("review approved by {}", reviewer),
        );
        Ok(updated)
    }

    /// Apply the reviewer's rejection
    ///
    /// Lands on `Rechazado` (terminal) for both kinds, stamps the reviewer
    /// and counting-end time, and nudges the parent order.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist or is not in
    /// `PendienteRevision`.
    pub fn reject(
        &self,
        tx_id: TransactionId,
        reviewer: ActorId,
        observations: Option<&str>,
    ) -> Result<Transaction, EngineError> {
        let tx = self.transactions.get(tx_id)?;
        state_machine::ensure_can_move(tx.status, TransactionStatus::Rechazado, tx_id)?;

        let updated =
            self.apply_review(tx_id, TransactionStatus::Rechazado, reviewer, observations)?;
        self.orders.advance(&updated.order_id, updated.status);

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.review_rejected",
            &updated,
            format!("review rejected by {}", reviewer),
        );
        Ok(updated)
    }

    /// Hand a provision over to the client
    ///
    /// The receiver must be a different identity than the deliverer; both
    /// are stamped along with the delivery time.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist, is not in
    /// `ListoParaEntrega`, or deliverer and receiver are the same actor.
    pub fn deliver(
        &self,
        tx_id: TransactionId,
        deliverer: ActorId,
        receiver: ActorId,
    ) -> Result<Transaction, EngineError> {
        if deliverer == receiver {
            return Err(EngineError::ReceiverIsDeliverer {
                tx: tx_id,
                actor: deliverer,
            });
        }
        let tx = self.transactions.get(tx_id)?;
        state_machine::ensure_can_move(tx.status, TransactionStatus::Entregado, tx_id)?;

        let updated = self.transactions.update(tx_id, |tx| {
            tx.status = TransactionStatus::Entregado;
            tx.delivered_by = Some(deliverer);
            tx.received_by = Some(receiver);
            tx.delivered_at = Some(Utc::now());
            Ok(())
        })?;

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.delivered",
            &updated,
            format!("delivered by {} to {}", deliverer, receiver),
        );
        Ok(updated)
    }

    /// Abandon a transaction
    ///
    /// Allowed from any non-terminal status; the reason is appended to the
    /// informative note.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist or is already terminal.
    pub fn cancel(
        &self,
        tx_id: TransactionId,
        actor: ActorId,
        reason: &str,
    ) -> Result<Transaction, EngineError> {
        let tx = self.transactions.get(tx_id)?;
        state_machine::ensure_can_move(tx.status, TransactionStatus::Cancelado, tx_id)?;

        let updated = self.transactions.update(tx_id, |tx| {
            tx.status = TransactionStatus::Cancelado;
            tx.append_note(reason);
            Ok(())
        })?;

        self.unit_of_work.commit()?;
        self.audit_tx(
            "tx.cancelled",
            &updated,
            format!("cancelled by {}: {}", actor, reason),
        );
        Ok(updated)
    }

    /// Record a discrepancy found while counting or reviewing
    ///
    /// The incident starts in `Reported` status and has no effect on totals
    /// until approved.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist or is in a status that no
    /// longer accepts incidents.
    pub fn report_incident(&self, incident: NewIncident) -> Result<Incident, EngineError> {
        let tx = self.transactions.get(incident.transaction_id)?;
        if !matches!(
            tx.status,
            TransactionStatus::Conteo | TransactionStatus::PendienteRevision
        ) {
            return Err(EngineError::IncidentsClosed {
                tx: tx.id,
                status: tx.status,
            });
        }

        let recorded = self.incidents.record(incident)?;
        self.unit_of_work.commit()?;
        self.audit.info(AuditEvent {
            code: "incident.reported",
            message: format!(
                "{} incident of {} reported on transaction {}",
                recorded.category, recorded.amount, recorded.transaction_id
            ),
            resulting_state: Some(tx.status),
            entity_type: "incident",
            entity_id: recorded.id,
            correlation_id: Some(tx.order_id),
        });
        Ok(recorded)
    }

    /// Decide a reported incident and refresh the totals
    ///
    /// Decisions are one-way. Recalculation runs after the decision so the
    /// transaction's difference always reflects the latest incident state.
    ///
    /// # Errors
    ///
    /// Fails when the incident does not exist or was already decided.
    pub fn review_incident(
        &self,
        incident_id: crate::types::IncidentId,
        decision: IncidentDecision,
        reviewer: ActorId,
    ) -> Result<(Incident, Totals), EngineError> {
        let decided = self.incidents.update(incident_id, |incident| {
            if incident.status != IncidentStatus::Reported {
                return Err(EngineError::IncidentAlreadyDecided {
                    incident: incident.id,
                    status: incident.status,
                });
            }
            incident.status = match decision {
                IncidentDecision::Approve => IncidentStatus::Approved,
                IncidentDecision::Reject => IncidentStatus::Rejected,
            };
            incident.reviewed_by = Some(reviewer);
            Ok(())
        })?;

        let totals = self.recalculate(decided.transaction_id)?;
        self.unit_of_work.commit()?;
        self.audit.info(AuditEvent {
            code: "incident.reviewed",
            message: format!(
                "incident {} {} by {}, difference now {}",
                decided.id, decided.status, reviewer, totals.difference
            ),
            resulting_state: None,
            entity_type: "incident",
            entity_id: decided.id,
            correlation_id: None,
        });
        Ok((decided, totals))
    }

    /// Recompute and persist the transaction's derived totals
    ///
    /// Runs inside every use case that changes container or incident state;
    /// exposed for read-path consumers that need fresh totals.
    pub fn recalculate(&self, tx_id: TransactionId) -> Result<Totals, EngineError> {
        aggregation::recalculate(&self.transactions, &self.containers, &self.incidents, tx_id)
    }

    /// Stamp a review decision
    fn apply_review(
        &self,
        tx_id: TransactionId,
        target: TransactionStatus,
        reviewer: ActorId,
        observations: Option<&str>,
    ) -> Result<Transaction, EngineError> {
        self.transactions.update(tx_id, |tx| {
            tx.status = target;
            tx.reviewed_by = Some(reviewer);
            tx.counting_ended_at = Some(Utc::now());
            if let Some(observations) = observations {
                tx.append_note(observations);
            }
            Ok(())
        })
    }

    /// Validate a whole batch before any write
    fn validate_batch(
        &self,
        tx: &Transaction,
        batch: &[ContainerDraft],
    ) -> Result<(), EngineError> {
        let value_types = AllowedValueTypesPolicy::for_kind(tx.kind);

        let mut by_code: HashMap<&str, &ContainerDraft> = HashMap::new();
        for container in batch {
            if by_code.insert(&container.code, container).is_some() {
                return Err(EngineError::DuplicateContainerCode {
                    code: container.code.clone(),
                });
            }
        }

        for container in batch {
            if container.kind == ContainerKind::Envelope {
                if !self.policies.envelope.allow_envelopes {
                    return Err(EngineError::EnvelopesDisabled {
                        code: container.code.clone(),
                    });
                }
                if container.envelope_kind.is_none() {
                    return Err(EngineError::MissingEnvelopeKind {
                        code: container.code.clone(),
                    });
                }
                if container.declared_value.is_some() {
                    return Err(EngineError::DeclaredValueOnEnvelope {
                        code: container.code.clone(),
                    });
                }
            }

            if let Some(parent_code) = &container.parent_code {
                let parent = by_code
                    .get(parent_code.as_str())
                    .ok_or_else(|| EngineError::orphan_parent(&container.code, parent_code))?;
                if parent.kind != ContainerKind::Bag {
                    return Err(EngineError::ParentNotBag {
                        code: container.code.clone(),
                        parent: parent_code.clone(),
                    });
                }
                if parent.parent_code.is_some() {
                    return Err(EngineError::nesting_too_deep(&container.code, parent_code));
                }
            }

            for detail in &container.details {
                value_types.check(detail.value_type)?;
                if let Some(subtype) = container.envelope_kind {
                    self.policies
                        .envelope
                        .check(&container.code, subtype, detail.value_type)?;
                }

                let computed = detail.expected_amount();
                if detail.amount != computed {
                    return Err(EngineError::amount_mismatch(
                        &container.code,
                        detail.amount,
                        computed,
                    ));
                }
                if let Some(expected_quantity) = detail.expected_quantity() {
                    if detail.quantity != expected_quantity {
                        return Err(EngineError::QuantityMismatch {
                            code: container.code.clone(),
                            quantity: detail.quantity,
                            computed: expected_quantity,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Emit a transaction-scoped audit event
    fn audit_tx(&self, code: &'static str, tx: &Transaction, message: String) {
        self.audit.info(AuditEvent {
            code,
            message,
            resulting_state: Some(tx.status),
            entity_type: "transaction",
            entity_id: tx.id,
            correlation_id: Some(tx.order_id.clone()),
        });
    }
}
