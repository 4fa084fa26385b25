use crate::policy::{CountingPolicy, EnvelopePolicy, PolicySet, TolerancePolicy};
use crate::types::TransactionKind;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

/// Replay a counting sheet through the reconciliation engine
#[derive(Parser, Debug)]
#[command(name = "cash-recon-engine")]
#[command(about = "Replay a counting sheet through the reconciliation engine", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing the counting sheet
    #[arg(value_name = "SHEET", help = "Path to the counting-sheet CSV file")]
    pub input_file: PathBuf,

    /// Transaction kind to replay the sheet against
    #[arg(
        long = "kind",
        value_name = "KIND",
        default_value = "collection",
        help = "Transaction kind: 'collection' or 'provision'"
    )]
    pub kind: KindArg,

    /// Service order the transaction belongs to
    #[arg(
        long = "order",
        value_name = "ORDER",
        help = "Service order reference"
    )]
    pub order: String,

    /// Currency of the declared and counted amounts
    #[arg(
        long = "currency",
        value_name = "CODE",
        default_value = "COP",
        help = "ISO currency code (must be in the supported set)"
    )]
    pub currency: String,

    /// Declared cash total (collections)
    #[arg(
        long = "declared",
        value_name = "AMOUNT",
        value_parser = parse_amount,
        help = "Declared cash total for a collection"
    )]
    pub declared_total: Option<Decimal>,

    /// Declared bill total (provisions)
    #[arg(
        long = "declared-bill",
        value_name = "AMOUNT",
        value_parser = parse_amount,
        help = "Declared bill total for a provision"
    )]
    pub declared_bill: Option<Decimal>,

    /// Declared coin total (provisions)
    #[arg(
        long = "declared-coin",
        value_name = "AMOUNT",
        value_parser = parse_amount,
        help = "Declared coin total for a provision"
    )]
    pub declared_coin: Option<Decimal>,

    /// Slip number from the paper trail
    #[arg(long = "slip", value_name = "SLIP", help = "Slip number")]
    pub slip_number: Option<String>,

    /// Absolute tolerance threshold
    #[arg(
        long = "tolerance",
        value_name = "AMOUNT",
        value_parser = parse_amount,
        help = "Absolute tolerance threshold (same unit as the amounts)"
    )]
    pub tolerance_absolute: Option<Decimal>,

    /// Percentage tolerance threshold
    #[arg(
        long = "tolerance-percent",
        value_name = "PERCENT",
        value_parser = parse_amount,
        help = "Percentage tolerance threshold (e.g. 0.5 for half a percent)"
    )]
    pub tolerance_percent: Option<Decimal>,

    /// Finalize the count after saving the containers
    #[arg(
        long = "finalize",
        help = "Finalize the count after saving, applying the tolerance gate"
    )]
    pub finalize: bool,

    /// Reject envelopes in the sheet
    #[arg(long = "no-envelopes", help = "Reject sheets that contain envelopes")]
    pub no_envelopes: bool,
}

/// Transaction kind as a CLI value
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Collection,
    Provision,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Collection => TransactionKind::Collection,
            KindArg::Provision => TransactionKind::Provision,
        }
    }
}

/// Parse a monetary amount argument
///
/// Decimal is not a native clap value type, so amounts go through this
/// explicit parser to keep exact arithmetic end to end.
fn parse_amount(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Invalid amount: '{}'", raw))
}

impl CliArgs {
    /// Build the policy set from CLI arguments
    ///
    /// Both tolerance flags given means the stricter of the two applies;
    /// one flag means only that threshold; neither means zero tolerance.
    pub fn to_policy_set(&self) -> PolicySet {
        let tolerance = match (self.tolerance_absolute, self.tolerance_percent) {
            (Some(absolute), Some(percent)) => TolerancePolicy {
                absolute,
                percent,
                mode: crate::policy::ToleranceMode::Stricter,
            },
            (Some(absolute), None) => TolerancePolicy::absolute(absolute),
            (None, Some(percent)) => TolerancePolicy::percent(percent),
            (None, None) => TolerancePolicy::default(),
        };
        PolicySet {
            counting: CountingPolicy::default(),
            tolerance,
            envelope: EnvelopePolicy {
                allow_envelopes: !self.no_envelopes,
            },
        }
    }

    /// The declared bill total, defaulting to zero
    pub fn declared_bill_or_zero(&self) -> Decimal {
        self.declared_bill.unwrap_or(Decimal::ZERO)
    }

    /// The declared coin total, defaulting to zero
    pub fn declared_coin_or_zero(&self) -> Decimal {
        self.declared_coin.unwrap_or(Decimal::ZERO)
    }
}
