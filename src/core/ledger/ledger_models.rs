// Domain models and ports for the ledger.
//
// The core only knows "a tabular remote store addressed by spreadsheet,
// tab and A1 range". The Google Sheets REST client in infra implements
// `SheetsApi`; a JSON file implements `LedgerStateStore`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::bet_slip::BetRecord;
use super::ledger_target::LedgerTarget;

/// First ledger column, which holds the date label.
pub const DATE_COLUMN: char = 'A';
/// Last ledger column: date, bet number, unit, odds.
pub const LAST_COLUMN: char = 'D';

// ============================================================================
// ROWS AND RANGES
// ============================================================================

/// A value written into one ledger cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(number) => write!(f, "{}", number),
        }
    }
}

/// One ledger row, 1:1 with a [`BetRecord`]. Appended, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date_label: String,
    pub bet_number: String,
    pub unit: f64,
    pub odds: String,
}

impl LedgerRow {
    pub fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.date_label.clone()),
            CellValue::Text(self.bet_number.clone()),
            CellValue::Number(self.unit),
            CellValue::Text(self.odds.clone()),
        ]
    }
}

impl From<&BetRecord> for LedgerRow {
    fn from(record: &BetRecord) -> Self {
        Self {
            date_label: record.date_label(),
            bet_number: record.bet_number.clone(),
            unit: record.unit,
            odds: record.odds.clone(),
        }
    }
}

/// An A1 range on one tab: whole columns, or a single row across columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet_name: String,
    pub first_column: char,
    pub last_column: char,
    /// 1-based row; `None` spans the whole columns.
    pub row: Option<u32>,
}

impl SheetRange {
    pub fn columns(sheet_name: &str, first_column: char, last_column: char) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            first_column,
            last_column,
            row: None,
        }
    }

    pub fn single_row(sheet_name: &str, first_column: char, last_column: char, row: u32) -> Self {
        Self {
            row: Some(row),
            ..Self::columns(sheet_name, first_column, last_column)
        }
    }

    /// The date column of the ledger.
    pub fn date_column(sheet_name: &str) -> Self {
        Self::columns(sheet_name, DATE_COLUMN, DATE_COLUMN)
    }

    /// Every ledger column.
    pub fn ledger_columns(sheet_name: &str) -> Self {
        Self::columns(sheet_name, DATE_COLUMN, LAST_COLUMN)
    }

    /// Number of columns covered.
    pub fn width(&self) -> u32 {
        (self.last_column as u32).saturating_sub(self.first_column as u32) + 1
    }

    /// Zero-based index of the first column.
    pub fn first_column_index(&self) -> u32 {
        (self.first_column as u32).saturating_sub('A' as u32)
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sheet = self.sheet_name.replace('\'', "''");
        match self.row {
            Some(row) => write!(
                f,
                "'{}'!{}{}:{}{}",
                sheet, self.first_column, row, self.last_column, row
            ),
            None => write!(f, "'{}'!{}:{}", sheet, self.first_column, self.last_column),
        }
    }
}

// ============================================================================
// PERSISTENT STATE
// ============================================================================

/// A bold that was requested but not yet confirmed by the remote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFormat {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// 1-based ledger row to bold.
    pub row: u32,
}

/// Everything the bot keeps across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub target: Option<LedgerTarget>,
    #[serde(default)]
    pub pending_formats: Vec<PendingFormat>,
}

// ============================================================================
// WRITE RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStatus {
    /// The date already had rows, nothing to bold.
    NotNewDate,
    /// First row of the day, bolded.
    Bolded,
    /// First row of the day, bold failed. A pending marker was kept.
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerWrite {
    pub target: LedgerTarget,
    pub row: u32,
    pub updated_cells: u32,
    pub format: FormatStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub applied: usize,
    pub still_pending: usize,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Could not reach Google Sheets: {0}")]
    Transport(String),

    #[error("Google Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected Google Sheets response: {0}")]
    Decode(String),

    #[error("Sheet '{0}' not found in spreadsheet")]
    SheetNotFound(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Failed to obtain Google access token: {0}")]
    Auth(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to locate the next empty row: {0}")]
    RowLookup(#[source] SheetsError),

    #[error("Failed to append row {row}: {source}")]
    Append {
        row: u32,
        #[source]
        source: SheetsError,
    },
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// PORTS
// ============================================================================

/// The remote spreadsheet the ledger lives in.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Reads a range as rows of displayed cell text. Trailing empty rows are
    /// not returned; an empty tab yields an empty vec.
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Writes one row of values, interpreted as if typed by a user.
    /// Returns the number of updated cells.
    async fn write_row(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        cells: &[CellValue],
    ) -> Result<u32, SheetsError>;

    /// Resolves a tab title to its numeric sheet id.
    async fn sheet_id(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<i64, SheetsError>;

    /// Sets bold text on exactly the cells of `range` (a single row range).
    async fn bold_range(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        range: &SheetRange,
    ) -> Result<(), SheetsError>;
}

/// Persistence for [`LedgerState`].
#[async_trait]
pub trait LedgerStateStore: Send + Sync {
    /// Returns the default state if nothing has been saved yet.
    async fn load(&self) -> Result<LedgerState, StateStoreError>;
    async fn save(&self, state: &LedgerState) -> Result<(), StateStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_render_as_quoted_a1() {
        assert_eq!(SheetRange::date_column("AugustVIP").to_string(), "'AugustVIP'!A:A");
        assert_eq!(
            SheetRange::ledger_columns("Sheet 1").to_string(),
            "'Sheet 1'!A:D"
        );
        assert_eq!(
            SheetRange::single_row("Sheet 1", 'A', 'D', 7).to_string(),
            "'Sheet 1'!A7:D7"
        );
        assert_eq!(
            SheetRange::date_column("Bob's").to_string(),
            "'Bob''s'!A:A"
        );
    }

    #[test]
    fn range_geometry() {
        let range = SheetRange::ledger_columns("Sheet1");
        assert_eq!(range.width(), 4);
        assert_eq!(range.first_column_index(), 0);
        assert_eq!(SheetRange::date_column("Sheet1").width(), 1);
    }

    #[test]
    fn ledger_row_cells_keep_types() {
        let row = LedgerRow {
            date_label: "2024-08-14".to_string(),
            bet_number: "007".to_string(),
            unit: 1.5,
            odds: "1.90".to_string(),
        };
        assert_eq!(
            row.cells(),
            vec![
                CellValue::Text("2024-08-14".to_string()),
                CellValue::Text("007".to_string()),
                CellValue::Number(1.5),
                CellValue::Text("1.90".to_string()),
            ]
        );
    }

    #[test]
    fn state_tolerates_missing_fields() {
        let state: LedgerState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, LedgerState::default());
    }
}
