// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "google_sheets/mod.rs"]
pub mod google_sheets;

#[path = "ledger/mod.rs"]
pub mod ledger;
