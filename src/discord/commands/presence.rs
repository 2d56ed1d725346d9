// Bot presence.
//
// Discord-layer glue only: shows operators at a glance which tab the bot
// is currently filling.

use poise::serenity_prelude as serenity;

use crate::core::ledger::LedgerTarget;

/// Shows the current ledger tab in the bot's status line.
pub fn show_target(ctx: &serenity::Context, target: &LedgerTarget) {
    let activity = serenity::ActivityData::watching(status_line(target));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context, target: &LedgerTarget) {
    show_target(ctx, target);
}

fn status_line(target: &LedgerTarget) -> String {
    format!("bet slips → {}", target.sheet_name)
}
