//! Counting policy
//!
//! Gates the creation of a countable transaction and its finalization.
//! Pure predicates over already-loaded data; no I/O.

use crate::types::{EngineError, TransactionId};
use rust_decimal::Decimal;

/// Admissibility rules for starting and closing a count
#[derive(Debug, Clone)]
pub struct CountingPolicy {
    /// Currency codes the back office operates in
    pub supported_currencies: Vec<String>,
}

impl Default for CountingPolicy {
    fn default() -> Self {
        CountingPolicy {
            supported_currencies: vec!["COP".to_string(), "USD".to_string()],
        }
    }
}

impl CountingPolicy {
    /// Whether a transaction may be queued for counting
    ///
    /// Rejects an empty service order reference, an unsupported currency,
    /// and a non-positive declared total.
    ///
    /// # Errors
    ///
    /// Returns a policy violation naming the offending value.
    pub fn can_create(
        &self,
        tx: TransactionId,
        order_id: &str,
        currency: &str,
        declared: Decimal,
    ) -> Result<(), EngineError> {
        if order_id.trim().is_empty() {
            return Err(EngineError::EmptyOrderReference { tx });
        }
        if !self
            .supported_currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(currency))
        {
            return Err(EngineError::UnsupportedCurrency {
                currency: currency.to_string(),
            });
        }
        if declared <= Decimal::ZERO {
            return Err(EngineError::NonPositiveDeclared { tx, declared });
        }
        Ok(())
    }

    /// Whether a count may be finalized
    ///
    /// A count with no value details across all containers cannot be
    /// finalized.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyCount`] when no details exist.
    pub fn can_finalize(&self, tx: TransactionId, detail_count: usize) -> Result<(), EngineError> {
        if detail_count == 0 {
            return Err(EngineError::EmptyCount { tx });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ok("ORD-1", "COP", 1_000_000, None)]
    #[case::case_insensitive_currency("ORD-1", "cop", 1, None)]
    #[case::empty_order("", "COP", 1_000_000, Some("Counting"))]
    #[case::blank_order("   ", "COP", 1_000_000, Some("Counting"))]
    #[case::bad_currency("ORD-1", "EUR", 1_000_000, Some("Counting"))]
    #[case::zero_declared("ORD-1", "COP", 0, Some("Counting"))]
    #[case::negative_declared("ORD-1", "COP", -5, Some("Counting"))]
    fn test_can_create(
        #[case] order: &str,
        #[case] currency: &str,
        #[case] declared: i64,
        #[case] violated_rule: Option<&str>,
    ) {
        let policy = CountingPolicy::default();
        let result = policy.can_create(1, order, currency, Decimal::from(declared));
        match violated_rule {
            None => assert!(result.is_ok()),
            Some(rule) => assert_eq!(result.unwrap_err().rule_name(), Some(rule)),
        }
    }

    #[rstest]
    #[case::empty(0, false)]
    #[case::one_detail(1, true)]
    #[case::many(40, true)]
    fn test_can_finalize(#[case] details: usize, #[case] ok: bool) {
        let policy = CountingPolicy::default();
        assert_eq!(policy.can_finalize(1, details).is_ok(), ok);
    }
}
