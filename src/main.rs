// This is the entry point of the bet ledger bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Google Sheets, local state)
// - `discord/` = Discord-specific adapters (commands, message relay)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;

use crate::config::BotConfig;
use crate::core::ledger::{LedgerService, LedgerStateStore};
use crate::discord::commands::presence;
use crate::discord::dispatcher;
use crate::discord::{Data, Error};
use crate::infra::google_sheets::{
    AccessTokenProvider, GoogleSheetsClient, InstalledAppAuth, ServiceAccountAuth,
};
use crate::infra::ledger::JsonLedgerStateStore;

/// Event handler for non-command Discord events.
/// Every ordinary message is a candidate bet slip.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        dispatcher::handle_message(framework.bot_id, data, new_message).await;
    }

    Ok(())
}

/// Service account when one is configured, otherwise the installed-app
/// flow with a token cached next to the ledger state.
async fn google_auth(config: &BotConfig) -> anyhow::Result<Box<dyn AccessTokenProvider>> {
    if let Some(auth) = ServiceAccountAuth::from_env().await {
        let auth = auth.context("Failed to load Google service account credentials")?;
        tracing::info!(
            client_email = auth.client_email(),
            "Using Google service account"
        );
        return Ok(Box::new(auth));
    }

    let auth = InstalledAppAuth::from_files(&config.oauth_client_secrets, config.token_path())
        .await
        .with_context(|| {
            format!(
                "Failed to read OAuth client secrets at {}",
                config.oauth_client_secrets.display()
            )
        })?;
    auth.authorize()
        .await
        .context("Failed to authorize with Google")?;
    tracing::info!("Using installed-app Google credentials");
    Ok(Box::new(auth))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // Keep runtime state in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let sheets = GoogleSheetsClient::new(google_auth(&config).await?);

    let store = JsonLedgerStateStore::new(config.state_path());
    let state = store
        .load()
        .await
        .context("Failed to load persisted ledger state")?;

    // A target chosen through the chat outlives restarts and wins over the
    // configured default.
    let target = match state.target {
        Some(target) => {
            tracing::info!(
                spreadsheet_id = %target.spreadsheet_id,
                sheet_name = %target.sheet_name,
                "Restored persisted ledger target"
            );
            target
        }
        None => config.default_target()?,
    };

    let ledger = Arc::new(LedgerService::with_state(
        sheets,
        store,
        target,
        state.pending_formats,
    ));

    let data = Data {
        ledger: Arc::clone(&ledger),
        timezone: config.timezone,
        prefix: config.prefix.clone(),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::ledger::set_spreadsheet(),
                discord::commands::ledger::set_sheet_name(),
                discord::commands::ledger::ledger_target(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                case_insensitive_commands: true,
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, _framework| {
            Box::pin(async move {
                let target = data.ledger.current_target().await;
                tracing::info!(
                    spreadsheet_id = %target.spreadsheet_id,
                    sheet_name = %target.sheet_name,
                    "Bot is ready"
                );
                presence::on_ready(ctx, &target);

                // Bolds that did not land before the last shutdown.
                let ledger = Arc::clone(&data.ledger);
                tokio::spawn(async move {
                    let report = ledger.recover_pending_formats().await;
                    if report.applied > 0 || report.still_pending > 0 {
                        tracing::info!(
                            applied = report.applied,
                            still_pending = report.still_pending,
                            "Replayed pending first-of-day bolds"
                        );
                    }
                });

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
