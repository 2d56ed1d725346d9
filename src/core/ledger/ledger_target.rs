// The ledger target names where bets are written: a spreadsheet and a tab
// inside it. It is shared by every chat, so a retarget from one channel
// redirects writes coming from all of them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Spreadsheet ids must be longer than this. A sanity check, not a format check.
const MIN_SPREADSHEET_ID_LEN: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Invalid Spreadsheet ID. Please provide a valid ID.")]
    InvalidSpreadsheetId,

    #[error("Invalid sheet name. Please provide a valid name.")]
    InvalidSheetName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl LedgerTarget {
    /// Builds a target, applying the same checks as the retarget commands.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Result<Self, TargetError> {
        let spreadsheet_id = spreadsheet_id.into();
        let sheet_name = sheet_name.into();
        validate_spreadsheet_id(&spreadsheet_id)?;
        validate_sheet_name(&sheet_name)?;
        Ok(Self {
            spreadsheet_id,
            sheet_name,
        })
    }
}

pub fn validate_spreadsheet_id(id: &str) -> Result<(), TargetError> {
    if id.chars().count() > MIN_SPREADSHEET_ID_LEN {
        Ok(())
    } else {
        Err(TargetError::InvalidSpreadsheetId)
    }
}

/// Word characters and whitespace only, at least one of them.
pub fn validate_sheet_name(name: &str) -> Result<(), TargetError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c.is_whitespace());
    if valid {
        Ok(())
    } else {
        Err(TargetError::InvalidSheetName)
    }
}

/// Shared, lock-guarded handle to the current target.
///
/// Writers take a [`snapshot`](Self::snapshot) once per write so a retarget
/// landing mid-write cannot split one row across two spreadsheets.
#[derive(Debug, Clone)]
pub struct TargetHandle {
    inner: Arc<RwLock<LedgerTarget>>,
}

impl TargetHandle {
    pub fn new(target: LedgerTarget) -> Self {
        Self {
            inner: Arc::new(RwLock::new(target)),
        }
    }

    pub async fn snapshot(&self) -> LedgerTarget {
        self.inner.read().await.clone()
    }

    /// Replaces the spreadsheet id. Last write wins.
    pub async fn set_spreadsheet_id(&self, id: &str) -> Result<LedgerTarget, TargetError> {
        validate_spreadsheet_id(id)?;
        let mut target = self.inner.write().await;
        target.spreadsheet_id = id.to_string();
        Ok(target.clone())
    }

    /// Replaces the sheet name. Last write wins.
    pub async fn set_sheet_name(&self, name: &str) -> Result<LedgerTarget, TargetError> {
        validate_sheet_name(name)?;
        let mut target = self.inner.write().await;
        target.sheet_name = name.to_string();
        Ok(target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> TargetHandle {
        TargetHandle::new(LedgerTarget::new("17iaYfvrJH5z7TFhfweQk", "AugustVIP").unwrap())
    }

    #[test]
    fn spreadsheet_id_must_exceed_ten_chars() {
        assert_eq!(
            validate_spreadsheet_id("0123456789"),
            Err(TargetError::InvalidSpreadsheetId)
        );
        assert!(validate_spreadsheet_id("0123456789a").is_ok());
        assert!(validate_spreadsheet_id("").is_err());
    }

    #[test]
    fn sheet_name_allows_word_chars_and_spaces() {
        assert!(validate_sheet_name("Sheet 1").is_ok());
        assert!(validate_sheet_name("August_VIP").is_ok());
        assert!(validate_sheet_name("Août").is_ok());
        assert_eq!(
            validate_sheet_name("Sheet-1"),
            Err(TargetError::InvalidSheetName)
        );
        assert!(validate_sheet_name("a'b").is_err());
        assert!(validate_sheet_name("").is_err());
    }

    #[test]
    fn rejection_messages_are_user_facing() {
        assert_eq!(
            TargetError::InvalidSheetName.to_string(),
            "Invalid sheet name. Please provide a valid name."
        );
    }

    #[tokio::test]
    async fn rejected_id_leaves_target_unchanged() {
        let handle = handle();
        let before = handle.snapshot().await;

        assert!(handle.set_spreadsheet_id("short").await.is_err());
        assert_eq!(handle.snapshot().await, before);
    }

    #[tokio::test]
    async fn accepted_updates_apply_to_every_clone() {
        let handle = handle();
        let other = handle.clone();

        handle
            .set_spreadsheet_id("not-a-real-spreadsheet")
            .await
            .unwrap();
        other.set_sheet_name("September VIP").await.unwrap();

        let target = handle.snapshot().await;
        assert_eq!(target.spreadsheet_id, "not-a-real-spreadsheet");
        assert_eq!(target.sheet_name, "September VIP");
    }

    #[tokio::test]
    async fn rejected_name_leaves_target_unchanged() {
        let handle = handle();
        assert_eq!(
            handle.set_sheet_name("Sheet-1").await,
            Err(TargetError::InvalidSheetName)
        );
        assert_eq!(handle.snapshot().await.sheet_name, "AugustVIP");
    }
}
