// Google Sheets infra layer.
// - `google_auth.rs` defines the token provider seam and its errors.
// - `service_account_auth.rs` / `installed_app_auth.rs` provide tokens.
// - `sheets_client.rs` talks to the Sheets REST API.

pub mod google_auth;
pub mod installed_app_auth;
pub mod service_account_auth;
pub mod sheets_client;

pub use google_auth::{AccessTokenProvider, AuthError};
pub use installed_app_auth::InstalledAppAuth;
pub use service_account_auth::ServiceAccountAuth;
pub use sheets_client::GoogleSheetsClient;
