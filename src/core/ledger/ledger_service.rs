// The ledger service appends bet records to the remote spreadsheet.
//
// No Discord types in here. The service is generic over the sheet API and
// the state store so the whole write path runs against in-memory fakes in
// tests.
//
// A write is:
//   1. read the date column (best effort) to learn whether today is new
//   2. count the populated rows to find the next empty one
//   3. write the row
//   4. if today is new, bold the row. The bold is recorded as pending
//      before it is sent and cleared once it succeeds, so a failed or
//      interrupted bold can be replayed later.

use std::collections::HashSet;
use tokio::sync::Mutex;

use super::bet_slip::BetRecord;
use super::ledger_models::{
    FormatStatus, LedgerError, LedgerRow, LedgerState, LedgerStateStore, LedgerWrite,
    PendingFormat, RecoveryReport, SheetRange, SheetsApi, SheetsError, DATE_COLUMN, LAST_COLUMN,
};
use super::ledger_target::{LedgerTarget, TargetError, TargetHandle};

pub struct LedgerService<A: SheetsApi, S: LedgerStateStore> {
    sheets: A,
    store: S,
    target: TargetHandle,
    pending: Mutex<Vec<PendingFormat>>,
    /// Serializes writes so two bets never compute the same next row.
    write_lock: Mutex<()>,
    /// Held across snapshot and save so an older snapshot never lands last.
    persist_lock: Mutex<()>,
}

impl<A: SheetsApi, S: LedgerStateStore> LedgerService<A, S> {
    pub fn new(sheets: A, store: S, target: LedgerTarget) -> Self {
        Self::with_state(sheets, store, target, Vec::new())
    }

    /// Builds the service from previously persisted state.
    pub fn with_state(
        sheets: A,
        store: S,
        target: LedgerTarget,
        pending: Vec<PendingFormat>,
    ) -> Self {
        Self {
            sheets,
            store,
            target: TargetHandle::new(target),
            pending: Mutex::new(pending),
            write_lock: Mutex::new(()),
            persist_lock: Mutex::new(()),
        }
    }

    pub async fn current_target(&self) -> LedgerTarget {
        self.target.snapshot().await
    }

    pub async fn pending_formats(&self) -> Vec<PendingFormat> {
        self.pending.lock().await.clone()
    }

    // ========================================================================
    // RETARGETING
    // ========================================================================

    pub async fn set_spreadsheet_id(&self, id: &str) -> Result<LedgerTarget, TargetError> {
        let target = self.target.set_spreadsheet_id(id).await?;
        tracing::info!(spreadsheet_id = %target.spreadsheet_id, "Ledger spreadsheet changed");
        self.persist().await;
        Ok(target)
    }

    pub async fn set_sheet_name(&self, name: &str) -> Result<LedgerTarget, TargetError> {
        let target = self.target.set_sheet_name(name).await?;
        tracing::info!(sheet_name = %target.sheet_name, "Ledger sheet changed");
        self.persist().await;
        Ok(target)
    }

    // ========================================================================
    // WRITING
    // ========================================================================

    /// Index of the first unused row: one past the populated rows of the
    /// ledger columns.
    ///
    /// Assumes the ledger has no gaps. A manually deleted row in the middle
    /// shifts the result and the next write lands on an existing row.
    pub async fn next_empty_row(&self, target: &LedgerTarget) -> Result<u32, SheetsError> {
        let rows = self
            .sheets
            .read_range(
                &target.spreadsheet_id,
                &SheetRange::ledger_columns(&target.sheet_name),
            )
            .await?;
        Ok(rows.len() as u32 + 1)
    }

    async fn known_dates(&self, target: &LedgerTarget) -> Result<HashSet<String>, SheetsError> {
        let rows = self
            .sheets
            .read_range(
                &target.spreadsheet_id,
                &SheetRange::date_column(&target.sheet_name),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// Appends `record` to the current target.
    pub async fn record_bet(&self, record: &BetRecord) -> Result<LedgerWrite, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let target = self.target.snapshot().await;
        let row = LedgerRow::from(record);

        let is_new_date = match self.known_dates(&target).await {
            Ok(dates) => !dates.contains(&row.date_label),
            Err(err) => {
                // Without the dates we can't tell, and a missing bold beats a wrong one.
                tracing::warn!(
                    sheet_name = %target.sheet_name,
                    "Failed to read existing dates, treating {} as seen: {}",
                    row.date_label,
                    err
                );
                false
            }
        };

        let next_row = self
            .next_empty_row(&target)
            .await
            .map_err(LedgerError::RowLookup)?;

        let range = SheetRange::single_row(&target.sheet_name, DATE_COLUMN, LAST_COLUMN, next_row);
        let updated_cells = self
            .sheets
            .write_row(&target.spreadsheet_id, &range, &row.cells())
            .await
            .map_err(|source| LedgerError::Append {
                row: next_row,
                source,
            })?;

        tracing::info!(
            row = next_row,
            bet_number = %row.bet_number,
            updated_cells,
            "Bet appended to {}",
            range
        );

        let format = if is_new_date {
            let pending = PendingFormat {
                spreadsheet_id: target.spreadsheet_id.clone(),
                sheet_name: target.sheet_name.clone(),
                row: next_row,
            };
            self.mark_pending(pending.clone()).await;

            match self.apply_format(&pending).await {
                Ok(()) => {
                    self.clear_pending(&pending).await;
                    FormatStatus::Bolded
                }
                Err(err) => {
                    tracing::error!(
                        row = next_row,
                        "Failed to bold first row of {}, left pending: {}",
                        row.date_label,
                        err
                    );
                    FormatStatus::Pending
                }
            }
        } else {
            FormatStatus::NotNewDate
        };

        Ok(LedgerWrite {
            target,
            row: next_row,
            updated_cells,
            format,
        })
    }

    // ========================================================================
    // PENDING FORMATS
    // ========================================================================

    /// Replays every pending bold. Bolding is idempotent, so a marker whose
    /// bold already landed before a crash is harmless to replay.
    pub async fn recover_pending_formats(&self) -> RecoveryReport {
        let _guard = self.write_lock.lock().await;
        let pending = self.pending.lock().await.clone();
        if pending.is_empty() {
            return RecoveryReport::default();
        }

        let mut remaining = Vec::new();
        let mut applied = 0;
        for marker in pending {
            match self.apply_format(&marker).await {
                Ok(()) => applied += 1,
                Err(err) => {
                    tracing::warn!(
                        spreadsheet_id = %marker.spreadsheet_id,
                        sheet_name = %marker.sheet_name,
                        row = marker.row,
                        "Pending bold still failing: {}",
                        err
                    );
                    remaining.push(marker);
                }
            }
        }

        let still_pending = remaining.len();
        *self.pending.lock().await = remaining;
        if applied > 0 {
            self.persist().await;
        }

        RecoveryReport {
            applied,
            still_pending,
        }
    }

    async fn apply_format(&self, marker: &PendingFormat) -> Result<(), SheetsError> {
        let sheet_id = self
            .sheets
            .sheet_id(&marker.spreadsheet_id, &marker.sheet_name)
            .await?;
        let range = SheetRange::single_row(&marker.sheet_name, DATE_COLUMN, LAST_COLUMN, marker.row);
        self.sheets
            .bold_range(&marker.spreadsheet_id, sheet_id, &range)
            .await
    }

    async fn mark_pending(&self, marker: PendingFormat) {
        self.pending.lock().await.push(marker);
        self.persist().await;
    }

    async fn clear_pending(&self, marker: &PendingFormat) {
        self.pending.lock().await.retain(|m| m != marker);
        self.persist().await;
    }

    /// Saves target and pending markers. A failed save is logged; the
    /// in-memory state stays authoritative for this process.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let state = LedgerState {
            target: Some(self.target.snapshot().await),
            pending_formats: self.pending.lock().await.clone(),
        };

        if let Err(err) = self.store.save(&state).await {
            tracing::warn!("Failed to persist ledger state: {}", err);
        }
    }
}
