// Discord commands for retargeting the ledger.
//
// Both commands are global: whoever runs them redirects the writes coming
// from every channel. Validation lives in the core; this layer only turns
// the outcome into a reply.

use super::presence;
use crate::core::ledger::LedgerService;
use crate::infra::google_sheets::GoogleSheetsClient;
use crate::infra::ledger::JsonLedgerStateStore;
use chrono_tz::Tz;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event.
pub struct Data {
    pub ledger: Arc<LedgerService<GoogleSheetsClient, JsonLedgerStateStore>>,
    /// Bets are dated by "today" in this timezone.
    pub timezone: Tz,
    /// Messages starting with this are commands, never bet slips.
    pub prefix: String,
}

/// Point the ledger at another spreadsheet.
#[poise::command(prefix_command, rename = "SetSpreadSheet")]
pub async fn set_spreadsheet(
    ctx: Context<'_>,
    #[rest]
    #[description = "Spreadsheet ID"]
    args: Option<String>,
) -> Result<(), Error> {
    let Some(spreadsheet_id) = first_argument(args.as_deref()) else {
        ctx.say("Please provide a new Spreadsheet ID.").await?;
        return Ok(());
    };

    let reply = match ctx.data().ledger.set_spreadsheet_id(spreadsheet_id).await {
        Ok(target) => {
            presence::show_target(ctx.serenity_context(), &target);
            format!("Spreadsheet ID updated to: {}", target.spreadsheet_id)
        }
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Write to another tab of the current spreadsheet.
#[poise::command(prefix_command, rename = "SetSheetName")]
pub async fn set_sheet_name(
    ctx: Context<'_>,
    #[rest]
    #[description = "Sheet name"]
    name: Option<String>,
) -> Result<(), Error> {
    let Some(name) = first_argument(name.as_deref()) else {
        ctx.say("Please provide a new sheet name.").await?;
        return Ok(());
    };

    let reply = match ctx.data().ledger.set_sheet_name(name).await {
        Ok(target) => {
            presence::show_target(ctx.serenity_context(), &target);
            format!("Sheet name updated to: {}", target.sheet_name)
        }
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Show where bets are currently written.
#[poise::command(prefix_command, rename = "LedgerTarget")]
pub async fn ledger_target(ctx: Context<'_>) -> Result<(), Error> {
    let ledger = &ctx.data().ledger;
    let target = ledger.current_target().await;
    let pending = ledger.pending_formats().await.len();

    ctx.say(format!(
        "Spreadsheet ID: {}\nSheet name: {}\nPending bold rows: {}",
        target.spreadsheet_id, target.sheet_name, pending
    ))
    .await?;
    Ok(())
}

/// Both commands take a single whitespace-delimited token; anything after
/// it is ignored.
fn first_argument(args: Option<&str>) -> Option<&str> {
    args.and_then(|a| a.split_whitespace().next())
}
