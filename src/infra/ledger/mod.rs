// Ledger infra layer.
// - `json_state_store.rs` persists the ledger target and pending bolds.

#[path = "json_state_store.rs"]
pub mod json_state_store;

pub use json_state_store::JsonLedgerStateStore;
