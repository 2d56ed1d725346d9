// Discord commands module.
// Each feature gets its own command file.

pub mod ledger;

// Bot presence management
pub mod presence;
