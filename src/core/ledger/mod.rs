pub mod bet_slip;
pub mod ledger_models;
pub mod ledger_service;
pub mod ledger_target;

pub use bet_slip::{ledger_today, parse_bet_slip, BetRecord};
pub use ledger_models::{
    CellValue, FormatStatus, LedgerState, LedgerStateStore, LedgerWrite, PendingFormat,
    SheetRange, SheetsApi, SheetsError, StateStoreError,
};
pub use ledger_service::LedgerService;
pub use ledger_target::{LedgerTarget, TargetError};
