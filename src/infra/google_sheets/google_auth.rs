// Access tokens for the Google Sheets API.
//
// The sheets client only needs "a valid bearer token right now". Where the
// token comes from is decided once at startup:
// - service account (JWT bearer grant), for headless deployments
// - installed-app OAuth with a stored refresh token, for a personal account

use async_trait::async_trait;
use thiserror::Error;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens are treated as expired this many seconds early.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] serde_json::Error),

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to sign JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Authorization flow failed: {0}")]
    Flow(String),
}

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Turns a non-2xx token endpoint response into [`AuthError::Rejected`].
pub(crate) async fn check_token_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Rejected { status, body })
}
