//! Audit and service-order sync implementations
//!
//! The production audit sink forwards engine events to `tracing`; the
//! logging order sync does the same for parent-order nudges. Both are
//! fire-and-forget: nothing here can fail the business operation.

use crate::core::traits::{AuditEvent, AuditSink, ServiceOrderSync};
use crate::types::TransactionStatus;
use tracing::{debug, info};

/// Audit sink backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn info(&self, event: AuditEvent) {
        info!(
            code = event.code,
            entity = event.entity_type,
            entity_id = event.entity_id,
            state = event.resulting_state.map(|s| s.to_string()),
            correlation = event.correlation_id,
            "{}",
            event.message
        );
    }
}

/// Order sync that only logs the nudge
///
/// Stands in where no order subsystem is wired up (CLI, tests); a real
/// deployment replaces it with an implementation that advances the service
/// order's status, never regressing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOrderSync;

impl ServiceOrderSync for LoggingOrderSync {
    fn advance(&self, order_id: &str, status: TransactionStatus) {
        debug!(order_id, %status, "service order advance requested");
    }
}
