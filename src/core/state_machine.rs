//! Transaction lifecycle state machine
//!
//! A single successor table defines every legal status edge. The
//! orchestrator performs the side effects of a transition; this module only
//! answers whether the edge exists.
//!
//! Terminal statuses (`Aprobado`, `Rechazado`, `Cancelado`) accept no
//! further transitions, ever. `Entregado` is equally final but reported as
//! an ordinary illegal edge, since it is a completed delivery rather than a
//! decision.

use crate::types::{EngineError, TransactionId, TransactionStatus};

/// The statuses reachable in one step from `current`
///
/// `Cancelado` appears in the successor set of every status that still has
/// an outcome pending; `Entregado` cash is already in the client's hands
/// and cannot be cancelled.
pub fn successors(current: TransactionStatus) -> &'static [TransactionStatus] {
    use TransactionStatus::*;
    match current {
        RegistroTesoreria => &[EncoladoParaConteo, Cancelado],
        ProvisionEnProceso => &[EncoladoParaConteo, Cancelado],
        EncoladoParaConteo => &[Conteo, Cancelado],
        Conteo => &[PendienteRevision, Cancelado],
        PendienteRevision => &[Aprobado, Rechazado, ListoParaEntrega, Cancelado],
        ListoParaEntrega => &[Entregado, Cancelado],
        Entregado => &[],
        Aprobado => &[],
        Rechazado => &[],
        Cancelado => &[],
    }
}

/// Validate a requested status change
///
/// # Errors
///
/// Returns [`EngineError::TerminalStatus`] when `current` is terminal, and
/// [`EngineError::IllegalTransition`] when `target` is not in the successor
/// set of `current`.
pub fn ensure_can_move(
    current: TransactionStatus,
    target: TransactionStatus,
    tx: TransactionId,
) -> Result<(), EngineError> {
    if current.is_terminal() {
        return Err(EngineError::terminal_status(tx, current));
    }
    if successors(current).contains(&target) {
        Ok(())
    } else {
        Err(EngineError::illegal_transition(tx, current, target))
    }
}
