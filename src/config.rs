// Runtime configuration, read from the environment (and `.env` via dotenv).
//
// **Environment Variables:**
// - `DISCORD_TOKEN` - Bot token (required)
// - `LEDGER_SPREADSHEET_ID` - Initial spreadsheet; required until a target
//   has been persisted by a retarget command
// - `LEDGER_SHEET_NAME` - Initial tab (default: `Sheet1`)
// - `LEDGER_TIMEZONE` - IANA zone used to date bets (default: `Europe/London`)
// - `LEDGER_DATA_DIR` - Where state and tokens live (default: `data`)
// - `BOT_PREFIX` - Command prefix (default: `!`, may not start with `#`)
// - `GOOGLE_OAUTH_CLIENT_SECRETS` - Installed-app client JSON (default: `credentials.json`)

use chrono_tz::Tz;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::ledger::{LedgerTarget, TargetError};

const DEFAULT_SHEET_NAME: &str = "Sheet1";
const DEFAULT_TIMEZONE: &str = "Europe/London";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PREFIX: &str = "!";
const DEFAULT_CLIENT_SECRETS: &str = "credentials.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    #[error("Unknown timezone '{0}' in LEDGER_TIMEZONE")]
    InvalidTimezone(String),

    #[error("BOT_PREFIX '{0}' would swallow bet slips, which start with '#'")]
    InvalidPrefix(String),

    #[error("Invalid default ledger target: {0}")]
    InvalidTarget(#[from] TargetError),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub default_spreadsheet_id: Option<String>,
    pub default_sheet_name: String,
    pub timezone: Tz,
    pub data_dir: PathBuf,
    pub prefix: String,
    pub oauth_client_secrets: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let tz_name = var("LEDGER_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(tz_name.clone()))?;

        let prefix = var("BOT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if prefix.starts_with('#') {
            return Err(ConfigError::InvalidPrefix(prefix));
        }

        Ok(Self {
            discord_token,
            default_spreadsheet_id: var("LEDGER_SPREADSHEET_ID"),
            default_sheet_name: var("LEDGER_SHEET_NAME")
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            timezone,
            data_dir: PathBuf::from(
                var("LEDGER_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            prefix,
            oauth_client_secrets: PathBuf::from(
                var("GOOGLE_OAUTH_CLIENT_SECRETS")
                    .unwrap_or_else(|| DEFAULT_CLIENT_SECRETS.to_string()),
            ),
        })
    }

    /// The target to use when none has been persisted yet. Goes through the
    /// same checks as the retarget commands.
    pub fn default_target(&self) -> Result<LedgerTarget, ConfigError> {
        let spreadsheet_id = self
            .default_spreadsheet_id
            .as_deref()
            .ok_or(ConfigError::Missing("LEDGER_SPREADSHEET_ID"))?;
        Ok(LedgerTarget::new(spreadsheet_id, self.default_sheet_name.as_str())?)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("ledger_state.json")
    }

    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("google_token.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("DISCORD_TOKEN", "token")]).unwrap();

        assert_eq!(config.default_sheet_name, "Sheet1");
        assert_eq!(config.timezone, chrono_tz::Europe::London);
        assert_eq!(config.prefix, "!");
        assert_eq!(config.state_path(), PathBuf::from("data/ledger_state.json"));
        assert_eq!(config.token_path(), PathBuf::from("data/google_token.json"));
        assert_eq!(config.default_spreadsheet_id, None);
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(
            config_from(&[("DISCORD_TOKEN", "  ")]),
            Err(ConfigError::Missing("DISCORD_TOKEN"))
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let result = config_from(&[("DISCORD_TOKEN", "t"), ("LEDGER_TIMEZONE", "Mars/Olympus")]);
        assert!(matches!(result, Err(ConfigError::InvalidTimezone(_))));
    }

    #[test]
    fn prefix_may_not_shadow_bet_slips() {
        let result = config_from(&[("DISCORD_TOKEN", "t"), ("BOT_PREFIX", "#")]);
        assert!(matches!(result, Err(ConfigError::InvalidPrefix(p)) if p == "#"));

        let config = config_from(&[("DISCORD_TOKEN", "t"), ("BOT_PREFIX", "?")]).unwrap();
        assert_eq!(config.prefix, "?");
    }

    #[test]
    fn default_target_is_validated() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "t"),
            ("LEDGER_SPREADSHEET_ID", "17iaYfvrJH5z7TFhfweQk"),
            ("LEDGER_SHEET_NAME", "AugustVIP"),
        ])
        .unwrap();
        let target = config.default_target().unwrap();
        assert_eq!(target.sheet_name, "AugustVIP");

        let config = config_from(&[
            ("DISCORD_TOKEN", "t"),
            ("LEDGER_SPREADSHEET_ID", "short"),
        ])
        .unwrap();
        assert!(matches!(
            config.default_target(),
            Err(ConfigError::InvalidTarget(TargetError::InvalidSpreadsheetId))
        ));
    }

    #[test]
    fn missing_spreadsheet_id_only_matters_for_the_default_target() {
        let config = config_from(&[("DISCORD_TOKEN", "t")]).unwrap();
        assert!(matches!(
            config.default_target(),
            Err(ConfigError::Missing("LEDGER_SPREADSHEET_ID"))
        ));
    }
}
