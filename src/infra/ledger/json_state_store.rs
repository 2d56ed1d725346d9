use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::ledger::{LedgerState, LedgerStateStore, StateStoreError};

/// Simple JSON file store for the ledger target and pending bolds.
pub struct JsonLedgerStateStore {
    path: PathBuf,
}

impl JsonLedgerStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LedgerStateStore for JsonLedgerStateStore {
    async fn load(&self) -> Result<LedgerState, StateStoreError> {
        if !self.path.exists() {
            return Ok(LedgerState::default());
        }

        let text = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn save(&self, state: &LedgerState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers see the old state or the new one, never a partial write.
        let text = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{LedgerTarget, PendingFormat};

    #[tokio::test]
    async fn missing_file_loads_default_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerStateStore::new(dir.path().join("ledger_state.json"));

        assert_eq!(store.load().await.unwrap(), LedgerState::default());
    }

    #[tokio::test]
    async fn saved_state_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerStateStore::new(dir.path().join("nested/ledger_state.json"));
        let state = LedgerState {
            target: Some(LedgerTarget::new("17iaYfvrJH5z7TFhfweQk", "Sheet 1").unwrap()),
            pending_formats: vec![PendingFormat {
                spreadsheet_id: "17iaYfvrJH5z7TFhfweQk".to_string(),
                sheet_name: "Sheet 1".to_string(),
                row: 12,
            }],
        };

        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn save_replaces_the_file_without_leaving_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger_state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonLedgerStateStore::new(&path);
        let state = LedgerState {
            target: Some(LedgerTarget::new("17iaYfvrJH5z7TFhfweQk", "AugustVIP").unwrap()),
            pending_formats: Vec::new(),
        };

        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ledger_state.json")]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger_state.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = JsonLedgerStateStore::new(&path).load().await;

        assert!(matches!(result, Err(StateStoreError::Serialization(_))));
    }
}
