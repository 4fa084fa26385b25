//! Counting-sheet CSV format
//!
//! This module centralizes the CSV format concerns of the replay tool:
//! - SheetRow structure for deserialization
//! - Conversion from sheet rows to container drafts
//! - Totals output serialization
//!
//! A counting sheet carries one row per value detail, with the owning
//! container's fields repeated on every row. Consecutive rows sharing a
//! container code fold into one [`ContainerDraft`]; a row with an empty
//! `value_type` registers a container with no details. Column values accept
//! the Spanish terms used on the printed sheets (bolsa/sobre,
//! efectivo/documento, billete/moneda/cheque) alongside the English ones.

use crate::types::{
    ContainerDraft, ContainerKind, EngineError, EnvelopeKind, Totals, ValueDetailDraft, ValueType,
};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;

/// One row of a counting sheet, as deserialized
///
/// Everything beyond the container code is optional: container-only rows
/// leave the detail columns empty, bag rows leave the envelope columns
/// empty, and only check rows carry the check columns.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SheetRow {
    /// Container code, repeated on every row of the container
    pub container: String,
    /// "bag"/"bolsa" or "envelope"/"sobre"; defaults to bag when empty
    pub container_type: Option<String>,
    /// "cash"/"efectivo" or "document"/"documento", envelopes only
    pub envelope_kind: Option<String>,
    /// Code of the parent bag, envelopes only
    pub parent: Option<String>,
    /// Amount on the bag's seal slip, first row of a bag only
    pub declared_value: Option<String>,
    /// Client cashier name, bags only
    pub cashier_name: Option<String>,
    /// Client cashier identity document, bags only
    pub cashier_document: Option<String>,
    /// "bill"/"billete", "coin"/"moneda", "check"/"cheque" or
    /// "document"/"documento"; empty for container-only rows
    pub value_type: Option<String>,
    /// Denomination face value, bills and coins
    pub denomination: Option<String>,
    /// Pieces per bundle, when the catalog knows it
    pub bundle_size: Option<String>,
    /// Quality grade reference
    pub quality: Option<String>,
    /// Total piece count
    pub quantity: Option<String>,
    /// Full bundles counted
    pub bundles: Option<String>,
    /// Loose pieces outside bundles
    pub loose: Option<String>,
    /// Value of one piece
    pub unit_value: Option<String>,
    /// Line amount as written on the sheet
    pub amount: Option<String>,
    /// High-denomination flag from the catalog ("true"/"1"/"si")
    pub high: Option<String>,
    /// Check number, checks only
    pub check_number: Option<String>,
    /// Issuing bank code, checks only
    pub bank: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_decimal(field: &Option<String>, name: &str) -> Result<Option<Decimal>, String> {
    match non_empty(field) {
        Some(raw) => Decimal::from_str(raw)
            .map(Some)
            .map_err(|_| format!("Invalid {}: '{}'", name, raw)),
        None => Ok(None),
    }
}

fn parse_count(field: &Option<String>, name: &str) -> Result<Option<u32>, String> {
    match non_empty(field) {
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("Invalid {}: '{}'", name, raw)),
        None => Ok(None),
    }
}

fn parse_flag(field: &Option<String>) -> bool {
    matches!(
        non_empty(field).map(str::to_lowercase).as_deref(),
        Some("true" | "1" | "si" | "yes")
    )
}

/// Parse the container-type column, defaulting to bag
fn parse_container_kind(field: &Option<String>) -> Result<ContainerKind, String> {
    match non_empty(field).map(str::to_lowercase).as_deref() {
        None | Some("bag" | "bolsa") => Ok(ContainerKind::Bag),
        Some("envelope" | "sobre") => Ok(ContainerKind::Envelope),
        Some(other) => Err(format!("Invalid container type: '{}'", other)),
    }
}

fn parse_envelope_kind(field: &Option<String>) -> Result<Option<EnvelopeKind>, String> {
    match non_empty(field).map(str::to_lowercase).as_deref() {
        None => Ok(None),
        Some("cash" | "efectivo") => Ok(Some(EnvelopeKind::Cash)),
        Some("document" | "documento") => Ok(Some(EnvelopeKind::Document)),
        Some(other) => Err(format!("Invalid envelope kind: '{}'", other)),
    }
}

fn parse_value_type(raw: &str) -> Result<ValueType, String> {
    match raw.to_lowercase().as_str() {
        "bill" | "billete" => Ok(ValueType::Bill),
        "coin" | "moneda" => Ok(ValueType::Coin),
        "check" | "cheque" => Ok(ValueType::Check),
        "document" | "documento" => Ok(ValueType::Document),
        other => Err(format!("Invalid value type: '{}'", other)),
    }
}

/// Convert a sheet row's container columns to a draft without details
///
/// Only the first row of each container contributes these columns; later
/// rows of the same container repeat them and are ignored by the grouping
/// in [`read_sheet`].
pub fn convert_container(row: &SheetRow) -> Result<ContainerDraft, String> {
    let kind = parse_container_kind(&row.container_type)?;
    Ok(ContainerDraft {
        code: row.container.trim().to_string(),
        kind,
        envelope_kind: parse_envelope_kind(&row.envelope_kind)?,
        parent_code: non_empty(&row.parent).map(str::to_string),
        declared_value: parse_decimal(&row.declared_value, "declared value")?,
        cashier_name: non_empty(&row.cashier_name).map(str::to_string),
        cashier_document: non_empty(&row.cashier_document).map(str::to_string),
        details: Vec::new(),
    })
}

/// Convert a sheet row's detail columns to a value detail draft
///
/// Returns `Ok(None)` for container-only rows (empty `value_type`). The
/// amount column is required and kept as written: the engine, not the
/// reader, decides whether it matches the quantity and unit value.
pub fn convert_detail(row: &SheetRow) -> Result<Option<ValueDetailDraft>, String> {
    let value_type = match non_empty(&row.value_type) {
        Some(raw) => parse_value_type(raw)?,
        None => return Ok(None),
    };

    let quantity = parse_count(&row.quantity, "quantity")?
        .ok_or_else(|| format!("Row of container '{}' is missing a quantity", row.container))?;
    let unit_value = parse_decimal(&row.unit_value, "unit value")?.ok_or_else(|| {
        format!("Row of container '{}' is missing a unit value", row.container)
    })?;
    let amount = parse_decimal(&row.amount, "amount")?
        .ok_or_else(|| format!("Row of container '{}' is missing an amount", row.container))?;

    let loose = parse_count(&row.loose, "loose count")?;
    let bundle_count = parse_count(&row.bundles, "bundle count")?.unwrap_or(0);

    Ok(Some(ValueDetailDraft {
        value_type,
        denomination: parse_decimal(&row.denomination, "denomination")?,
        bundle_size: parse_count(&row.bundle_size, "bundle size")?,
        quality: non_empty(&row.quality).map(str::to_string),
        quantity,
        bundle_count,
        loose_count: loose.unwrap_or(quantity),
        unit_value,
        amount,
        is_high_denomination: parse_flag(&row.high),
        check_number: non_empty(&row.check_number).map(str::to_string),
        bank_code: non_empty(&row.bank).map(str::to_string),
    }))
}

/// Read a whole counting sheet into container drafts
///
/// Consecutive rows sharing a container code fold into one draft. Rows
/// that fail conversion are collected as line-tagged messages instead of
/// aborting the read; structural problems (duplicate codes across
/// non-consecutive groups, orphan parents) are left for the engine's batch
/// validation.
///
/// # Errors
///
/// Returns [`EngineError::Parse`] only for failures of the CSV layer
/// itself; row-level conversion errors come back in the second element.
pub fn read_sheet<R: Read>(input: R) -> Result<(Vec<ContainerDraft>, Vec<String>), EngineError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut drafts: Vec<ContainerDraft> = Vec::new();
    let mut row_errors = Vec::new();

    // Header is line 1
    for (index, record) in reader.deserialize::<SheetRow>().enumerate() {
        let line = index as u64 + 2;
        let row = match record {
            Ok(row) => row,
            Err(error) => {
                row_errors.push(format!("Line {}: {}", line, error));
                continue;
            }
        };
        if row.container.trim().is_empty() {
            row_errors.push(format!("Line {}: missing container code", line));
            continue;
        }

        let code = row.container.trim();
        if drafts.last().map(|d| d.code.as_str()) != Some(code) {
            match convert_container(&row) {
                Ok(draft) => drafts.push(draft),
                Err(message) => {
                    row_errors.push(format!("Line {}: {}", line, message));
                    continue;
                }
            }
        }
        match convert_detail(&row) {
            Ok(Some(detail)) => {
                // last() is present: the container was pushed above or on
                // an earlier row of the same group
                if let Some(draft) = drafts.last_mut() {
                    draft.details.push(detail);
                }
            }
            Ok(None) => {}
            Err(message) => row_errors.push(format!("Line {}: {}", line, message)),
        }
    }

    Ok((drafts, row_errors))
}

/// Write a transaction's totals as a one-row CSV
///
/// Columns mirror the [`Totals`] breakdown so the output can feed a
/// spreadsheet directly.
///
/// # Errors
///
/// Returns [`EngineError::Io`] when the underlying writer fails.
pub fn write_totals_csv(totals: &Totals, output: &mut dyn Write) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "bill_high",
        "bill_low",
        "coin",
        "check",
        "document",
        "counted",
        "overall",
        "declared_cash",
        "incident_adjustment",
        "difference",
    ])?;
    writer.write_record(&[
        totals.bill_high.to_string(),
        totals.bill_low.to_string(),
        totals.coin.to_string(),
        totals.check.to_string(),
        totals.document.to_string(),
        totals.counted.to_string(),
        totals.overall.to_string(),
        totals.declared_cash.to_string(),
        totals.incident_adjustment.to_string(),
        totals.difference.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEADER: &str = "container,container_type,envelope_kind,parent,declared_value,cashier_name,cashier_document,value_type,denomination,bundle_size,quality,quantity,bundles,loose,unit_value,amount,high,check_number,bank";

    fn sheet(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_groups_consecutive_rows_by_container() {
        let input = sheet(&[
            "B1,bolsa,,,1000000,Maria Perez,CC-1019,billete,50000,100,A,20,0,20,50000,1000000,si,,",
            "B1,bolsa,,,1000000,Maria Perez,CC-1019,moneda,500,,,40,0,40,500,20000,,,",
            "S1,sobre,documento,B1,,,,cheque,,,,1,0,1,250000,250000,,CHK-88,001",
        ]);
        let (drafts, errors) = read_sheet(input.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(drafts.len(), 2);

        let bag = &drafts[0];
        assert_eq!(bag.code, "B1");
        assert_eq!(bag.kind, ContainerKind::Bag);
        assert_eq!(bag.declared_value, Some(Decimal::from(1_000_000)));
        assert_eq!(bag.cashier_name.as_deref(), Some("Maria Perez"));
        assert_eq!(bag.details.len(), 2);
        assert_eq!(bag.details[0].value_type, ValueType::Bill);
        assert!(bag.details[0].is_high_denomination);
        assert_eq!(bag.details[0].bundle_size, Some(100));
        assert_eq!(bag.details[1].value_type, ValueType::Coin);

        let envelope = &drafts[1];
        assert_eq!(envelope.kind, ContainerKind::Envelope);
        assert_eq!(envelope.envelope_kind, Some(EnvelopeKind::Document));
        assert_eq!(envelope.parent_code.as_deref(), Some("B1"));
        assert_eq!(envelope.details[0].check_number.as_deref(), Some("CHK-88"));
        assert_eq!(envelope.details[0].bank_code.as_deref(), Some("001"));
    }

    #[test]
    fn test_container_only_row_registers_empty_bag() {
        let input = sheet(&["B1,bag,,,,,,,,,,,,,,,,,"]);
        let (drafts, errors) = read_sheet(input.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].details.is_empty());
    }

    #[test]
    fn test_bad_rows_collected_not_fatal() {
        let input = sheet(&[
            "B1,bag,,,,,,billete,50000,,,2,0,2,50000,100000,,,",
            "B1,bag,,,,,,billete,50000,,,not_a_number,0,2,50000,100000,,,",
            ",bag,,,,,,billete,50000,,,2,0,2,50000,100000,,,",
            "B2,crate,,,,,,,,,,,,,,,,,",
        ]);
        let (drafts, errors) = read_sheet(input.as_bytes()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].details.len(), 1);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("Line 3"));
        assert!(errors[0].contains("Invalid quantity"));
        assert!(errors[1].contains("missing container code"));
        assert!(errors[2].contains("Invalid container type"));
    }

    #[rstest]
    #[case::english("bill", ValueType::Bill)]
    #[case::spanish_bill("billete", ValueType::Bill)]
    #[case::spanish_coin("Moneda", ValueType::Coin)]
    #[case::spanish_check("cheque", ValueType::Check)]
    #[case::document_either("documento", ValueType::Document)]
    fn test_value_type_aliases(#[case] raw: &str, #[case] expected: ValueType) {
        assert_eq!(parse_value_type(raw).unwrap(), expected);
    }

    #[test]
    fn test_loose_defaults_to_quantity_without_bundles() {
        let input = sheet(&["B1,bag,,,,,,billete,10000,,,7,,,10000,70000,,,"]);
        let (drafts, errors) = read_sheet(input.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(drafts[0].details[0].loose_count, 7);
        assert_eq!(drafts[0].details[0].bundle_count, 0);
    }

    #[test]
    fn test_write_totals_round_numbers() {
        let totals = Totals {
            bill_high: Decimal::from(900_000),
            bill_low: Decimal::from(80_000),
            coin: Decimal::from(20_000),
            check: Decimal::from(250_000),
            document: Decimal::ZERO,
            counted: Decimal::from(1_000_000),
            overall: Decimal::from(1_250_000),
            declared_cash: Decimal::from(1_000_000),
            incident_adjustment: Decimal::ZERO,
            difference: Decimal::ZERO,
        };
        let mut buffer = Vec::new();
        write_totals_csv(&totals, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("bill_high,bill_low"));
        assert_eq!(
            lines.next().unwrap(),
            "900000,80000,20000,250000,0,1000000,1250000,1000000,0,0"
        );
    }
}
