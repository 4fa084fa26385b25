//! Counting-sheet input and totals output

pub mod sheet;

pub use sheet::{read_sheet, write_totals_csv, SheetRow};
