// =============================================================================
// INSTALLED-APP OAUTH (personal Google account)
// =============================================================================
//
// The first run needs a human: the bot prints a consent URL, the operator
// approves in a browser, and Google redirects to a loopback listener with an
// authorization code. The code is exchanged for an access token plus a
// long-lived refresh token, both stored on disk. Later runs load the stored
// token and refresh it silently.
//
// **Environment Variables:**
// - `GOOGLE_OAUTH_CLIENT_SECRETS` - Path to the "Desktop app" client JSON
//   downloaded from Google Cloud Console (default: `credentials.json`)

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use super::google_auth::{
    check_token_response, AccessTokenProvider, AuthError, EXPIRY_MARGIN_SECS, SHEETS_SCOPE,
};

/// OAuth client as downloaded from Google Cloud Console.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

/// What we keep on disk between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

pub struct InstalledAppAuth {
    secrets: ClientSecrets,
    token_path: PathBuf,
    client: Client,
    token: Mutex<Option<StoredToken>>,
}

impl InstalledAppAuth {
    pub async fn from_files(
        secrets_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self, AuthError> {
        let text = tokio::fs::read_to_string(secrets_path.as_ref()).await?;
        let file: ClientSecretsFile = serde_json::from_str(&text)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::Flow("client secrets have no `installed` or `web` section".to_string())
        })?;

        Ok(Self {
            secrets,
            token_path: token_path.into(),
            client: Client::new(),
            token: Mutex::new(None),
        })
    }

    /// Makes sure a usable token exists: stored, refreshed, or freshly
    /// granted through the interactive consent flow.
    pub async fn authorize(&self) -> Result<(), AuthError> {
        let mut guard = self.token.lock().await;

        if let Some(stored) = self.load_stored().await {
            if stored.is_fresh(Utc::now()) {
                *guard = Some(stored);
                return Ok(());
            }

            match self.refresh(&stored).await {
                Ok(refreshed) => {
                    self.save(&refreshed).await?;
                    *guard = Some(refreshed);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!("Stored Google token could not be refreshed: {}", err);
                }
            }
        }

        let granted = self.run_consent_flow().await?;
        self.save(&granted).await?;
        *guard = Some(granted);
        Ok(())
    }

    async fn load_stored(&self) -> Option<StoredToken> {
        let text = tokio::fs::read_to_string(&self.token_path).await.ok()?;
        match serde_json::from_str(&text) {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.token_path.display(),
                    err
                );
                None
            }
        }
    }

    async fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        if let Some(parent) = self.token_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.token_path, text).await?;
        Ok(())
    }

    async fn refresh(&self, stored: &StoredToken) -> Result<StoredToken, AuthError> {
        let response = self
            .client
            .post(&self.secrets.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", stored.refresh_token.as_str()),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
            ])
            .send()
            .await?;

        let response: TokenResponse = check_token_response(response).await?.json().await?;
        tracing::debug!("Refreshed Google access token");
        token_from_response(response, Some(&stored.refresh_token), Utc::now())
    }

    async fn run_consent_flow(&self) -> Result<StoredToken, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
        let state = random_state();
        let url = consent_url(&self.secrets, &redirect_uri, &state)?;

        println!("Authorize Google Sheets access by opening this URL:\n\n{}\n", url);
        tracing::info!("Waiting for Google authorization on {}", redirect_uri);

        let code = catch_redirect(listener, state).await?;

        let response = self
            .client
            .post(&self.secrets.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
            ])
            .send()
            .await?;

        let response: TokenResponse = check_token_response(response).await?.json().await?;
        tracing::info!("Google authorization granted");
        token_from_response(response, None, Utc::now())
    }
}

#[async_trait]
impl AccessTokenProvider for InstalledAppAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.token.lock().await;
        let stored = guard
            .as_ref()
            .ok_or_else(|| AuthError::Flow("not authorized yet".to_string()))?;

        if stored.is_fresh(Utc::now()) {
            return Ok(stored.access_token.clone());
        }

        let refreshed = self.refresh(stored).await?;
        if let Err(err) = self.save(&refreshed).await {
            tracing::warn!("Failed to store refreshed Google token: {}", err);
        }
        let token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(token)
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn consent_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", SHEETS_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::Flow(format!("invalid auth_uri: {}", e)))
}

// =============================================================================
// REDIRECT LISTENER
// =============================================================================

struct RedirectCatcher {
    expected_state: String,
    result: Mutex<Option<oneshot::Sender<Result<String, AuthError>>>>,
}

/// Serves the loopback redirect until Google sends a code (or an error),
/// then shuts the server down gracefully and returns the code.
async fn catch_redirect(listener: TcpListener, expected_state: String) -> Result<String, AuthError> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let catcher = Arc::new(RedirectCatcher {
        expected_state,
        result: Mutex::new(Some(result_tx)),
    });
    let app = Router::new()
        .route("/", get(handle_redirect))
        .with_state(catcher);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let outcome = result_rx
        .await
        .map_err(|_| AuthError::Flow("redirect listener stopped".to_string()));
    let _ = shutdown_tx.send(());

    match server.await {
        Ok(Err(err)) => tracing::warn!("Redirect listener failed: {}", err),
        Err(err) => tracing::warn!("Redirect listener task failed: {}", err),
        Ok(Ok(())) => {}
    }

    outcome?
}

async fn handle_redirect(
    State(catcher): State<Arc<RedirectCatcher>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    let (reply, result) = match check_redirect(&params, &catcher.expected_state) {
        Ok(None) => return (StatusCode::NOT_FOUND, "Not found."),
        Ok(Some(code)) => (
            (StatusCode::OK, "Authorization complete. You can close this tab."),
            Ok(code),
        ),
        Err(err) => (
            (StatusCode::BAD_REQUEST, "Authorization failed. Check the bot logs."),
            Err(err),
        ),
    };

    if let Some(tx) = catcher.result.lock().await.take() {
        let _ = tx.send(result);
    }
    reply
}

/// Reads the authorization code out of the redirect's query.
///
/// `Ok(None)` means the request carried neither a code nor an error and we
/// should keep waiting.
fn check_redirect(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<Option<String>, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(AuthError::Flow(format!("consent denied: {}", error)));
    }

    match params.get("code") {
        None => Ok(None),
        Some(_) if params.get("state").map(String::as_str) != Some(expected_state) => {
            Err(AuthError::Flow("state mismatch in redirect".to_string()))
        }
        Some(code) => Ok(Some(code.clone())),
    }
}

/// Google only returns a refresh token on the first grant; refreshes reuse
/// the one we already have.
fn token_from_response(
    response: TokenResponse,
    previous_refresh_token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StoredToken, AuthError> {
    let refresh_token = response
        .refresh_token
        .or_else(|| previous_refresh_token.map(str::to_string))
        .ok_or_else(|| AuthError::Flow("no refresh token granted".to_string()))?;

    Ok(StoredToken {
        access_token: response.access_token,
        refresh_token,
        expires_at: now + Duration::seconds(response.expires_in),
    })
}
