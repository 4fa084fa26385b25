//! Tolerance policy
//!
//! Decides whether the gap between a declared and a counted amount is
//! acceptable. The threshold can be configured as an absolute amount, a
//! percentage of the declared amount, or both; with both configured the
//! stricter (smaller) threshold wins unless a single-threshold mode is
//! chosen explicitly. The boundary is inclusive: a gap exactly at the
//! threshold passes.

use crate::types::{EngineError, TransactionId};
use rust_decimal::Decimal;

/// How to combine the absolute and percentage thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToleranceMode {
    /// Use the smaller of the two thresholds
    #[default]
    Stricter,

    /// Use only the absolute threshold
    AbsoluteOnly,

    /// Use only the percentage threshold
    PercentOnly,
}

/// Acceptable counted-vs-declared gap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TolerancePolicy {
    /// Absolute threshold in transaction currency
    pub absolute: Decimal,

    /// Percentage threshold, applied to the declared amount (1 = 1%)
    pub percent: Decimal,

    /// How the two thresholds combine
    pub mode: ToleranceMode,
}

impl Default for TolerancePolicy {
    /// Zero tolerance: counted must equal declared
    fn default() -> Self {
        TolerancePolicy {
            absolute: Decimal::ZERO,
            percent: Decimal::ZERO,
            mode: ToleranceMode::Stricter,
        }
    }
}

impl TolerancePolicy {
    /// A policy with only an absolute threshold
    pub fn absolute(threshold: Decimal) -> Self {
        TolerancePolicy {
            absolute: threshold,
            percent: Decimal::ZERO,
            mode: ToleranceMode::AbsoluteOnly,
        }
    }

    /// A policy with only a percentage threshold
    pub fn percent(percent: Decimal) -> Self {
        TolerancePolicy {
            absolute: Decimal::ZERO,
            percent,
            mode: ToleranceMode::PercentOnly,
        }
    }

    /// The threshold effective for a given declared amount
    pub fn effective_threshold(&self, declared: Decimal) -> Decimal {
        let percent_threshold = declared.abs() * self.percent / Decimal::ONE_HUNDRED;
        match self.mode {
            ToleranceMode::AbsoluteOnly => self.absolute,
            ToleranceMode::PercentOnly => percent_threshold,
            ToleranceMode::Stricter => self.absolute.min(percent_threshold),
        }
    }

    /// Whether the gap between declared and counted is acceptable
    ///
    /// Boundary inclusive: a gap exactly at the threshold is accepted.
    pub fn is_within_tolerance(&self, declared: Decimal, counted: Decimal) -> bool {
        (declared - counted).abs() <= self.effective_threshold(declared)
    }

    /// Check the gap, reporting the numbers involved on failure
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ToleranceExceeded`] carrying the declared and
    /// counted amounts, the gap and the effective threshold.
    pub fn check(
        &self,
        tx: TransactionId,
        declared: Decimal,
        counted: Decimal,
    ) -> Result<(), EngineError> {
        if self.is_within_tolerance(declared, counted) {
            Ok(())
        } else {
            Err(EngineError::tolerance_exceeded(
                tx,
                declared,
                counted,
                self.effective_threshold(declared),
            ))
        }
    }
}
