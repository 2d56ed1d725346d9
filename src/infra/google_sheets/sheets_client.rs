// =============================================================================
// GOOGLE SHEETS CLIENT
// =============================================================================
//
// Thin REST client for the four Sheets v4 calls the ledger needs:
// - `GET  spreadsheets/{id}/values/{range}`           read a range
// - `PUT  spreadsheets/{id}/values/{range}`           write one row, USER_ENTERED
// - `GET  spreadsheets/{id}?fields=sheets.properties` tab title -> sheet id
// - `POST spreadsheets/{id}:batchUpdate`              bold one row
//
// No retries and no timeouts: a failure surfaces to the ledger service,
// which decides whether the write survives it.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::google_auth::AccessTokenProvider;
use crate::core::ledger::{CellValue, SheetRange, SheetsApi, SheetsError};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// =============================================================================
// API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: u32,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    /// The first tab's id is 0, which Google may leave out.
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleSheetsClient {
    client: Client,
    auth: Box<dyn AccessTokenProvider>,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(auth: Box<dyn AccessTokenProvider>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: SHEETS_API_BASE.to_string(),
        }
    }

    /// Sends an authorized request and decodes a successful JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SheetsError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| SheetsError::Auth(e.to_string()))?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SheetsError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let a1 = range.to_string();
        let url = spreadsheet_url(&self.base_url, spreadsheet_id, &["values", &a1])?;
        tracing::debug!("Reading {} from {}", a1, spreadsheet_id);

        let body: ValueRange = self.execute(self.client.get(url)).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_row(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        cells: &[CellValue],
    ) -> Result<u32, SheetsError> {
        let a1 = range.to_string();
        let url = spreadsheet_url(&self.base_url, spreadsheet_id, &["values", &a1])?;

        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&value_range_body(range, cells));
        let body: UpdateValuesResponse = self.execute(request).await?;
        Ok(body.updated_cells)
    }

    async fn sheet_id(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<i64, SheetsError> {
        let url = spreadsheet_url(&self.base_url, spreadsheet_id, &[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties")]);
        let spreadsheet: Spreadsheet = self.execute(request).await?;

        spreadsheet
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == sheet_name)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| SheetsError::SheetNotFound(sheet_name.to_string()))
    }

    async fn bold_range(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        range: &SheetRange,
    ) -> Result<(), SheetsError> {
        let body = bold_request_body(sheet_id, range)?;
        let url = batch_update_url(&self.base_url, spreadsheet_id)?;

        let _: Value = self.execute(self.client.post(url).json(&body)).await?;
        tracing::debug!("Bolded {} in {}", range, spreadsheet_id);
        Ok(())
    }
}

// =============================================================================
// REQUEST HELPERS
// =============================================================================

/// `{base}/{spreadsheet_id}/{segments...}`, each segment percent-encoded.
fn spreadsheet_url(base: &str, spreadsheet_id: &str, segments: &[&str]) -> Result<Url, SheetsError> {
    let mut url = Url::parse(base).map_err(|e| SheetsError::Transport(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| SheetsError::Transport(format!("cannot use {} as a base URL", base)))?
        .push(spreadsheet_id)
        .extend(segments);
    Ok(url)
}

fn batch_update_url(base: &str, spreadsheet_id: &str) -> Result<Url, SheetsError> {
    spreadsheet_url(base, &format!("{}:batchUpdate", spreadsheet_id), &[])
}

/// Displayed text of a cell as returned with the default FORMATTED_VALUE rendering.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Text(text) => Value::String(text.clone()),
        CellValue::Number(number) => json!(number),
    }
}

fn value_range_body(range: &SheetRange, cells: &[CellValue]) -> Value {
    json!({
        "range": range.to_string(),
        "majorDimension": "ROWS",
        "values": [cells.iter().map(cell_json).collect::<Vec<_>>()],
    })
}

fn bold_request_body(sheet_id: i64, range: &SheetRange) -> Result<Value, SheetsError> {
    let row = range
        .row
        .ok_or_else(|| SheetsError::InvalidRange(format!("{} is not a single row", range)))?;
    let first_column = range.first_column_index();

    Ok(json!({
        "requests": [{
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": row.saturating_sub(1),
                    "endRowIndex": row,
                    "startColumnIndex": first_column,
                    "endColumnIndex": first_column + range.width(),
                },
                "cell": {
                    "userEnteredFormat": {
                        "textFormat": { "bold": true }
                    }
                },
                "fields": "userEnteredFormat.textFormat.bold",
            }
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_urls_encode_the_range() {
        let range = SheetRange::date_column("Sheet 1");
        let url = spreadsheet_url(SHEETS_API_BASE, "abc123def456", &["values", &range.to_string()])
            .unwrap();

        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc123def456/values/"));
        assert!(url.as_str().contains("Sheet%201"));
        assert!(url.as_str().ends_with("!A:A"));
    }

    #[test]
    fn batch_update_url_uses_custom_method_suffix() {
        let url = batch_update_url(SHEETS_API_BASE, "abc123def456").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123def456:batchUpdate"
        );
    }

    #[test]
    fn row_body_keeps_unit_numeric() {
        let range = SheetRange::single_row("AugustVIP", 'A', 'D', 5);
        let cells = vec![
            CellValue::Text("2024-08-14".to_string()),
            CellValue::Text("123".to_string()),
            CellValue::Number(1.5),
            CellValue::Text("1.90".to_string()),
        ];

        let body = value_range_body(&range, &cells);

        assert_eq!(body["range"], "'AugustVIP'!A5:D5");
        assert_eq!(body["majorDimension"], "ROWS");
        assert_eq!(body["values"], json!([["2024-08-14", "123", 1.5, "1.90"]]));
    }

    #[test]
    fn bold_body_covers_exactly_one_row_of_four_cells() {
        let range = SheetRange::single_row("AugustVIP", 'A', 'D', 5);
        let body = bold_request_body(42, &range).unwrap();
        let repeat = &body["requests"][0]["repeatCell"];

        assert_eq!(
            repeat["range"],
            json!({
                "sheetId": 42,
                "startRowIndex": 4,
                "endRowIndex": 5,
                "startColumnIndex": 0,
                "endColumnIndex": 4,
            })
        );
        assert_eq!(
            repeat["cell"]["userEnteredFormat"]["textFormat"]["bold"],
            true
        );
        assert_eq!(repeat["fields"], "userEnteredFormat.textFormat.bold");
    }

    #[test]
    fn bold_body_rejects_whole_columns() {
        let range = SheetRange::ledger_columns("AugustVIP");
        assert!(matches!(
            bold_request_body(0, &range),
            Err(SheetsError::InvalidRange(_))
        ));
    }

    #[test]
    fn cells_render_as_displayed_text() {
        assert_eq!(cell_text(&json!("2024-08-14")), "2024-08-14");
        assert_eq!(cell_text(&json!(12)), "12");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn spreadsheet_lookup_defaults_missing_sheet_id_to_zero() {
        let json = r#"{"sheets": [
            {"properties": {"title": "AugustVIP"}},
            {"properties": {"sheetId": 917, "title": "September VIP"}}
        ]}"#;
        let spreadsheet: Spreadsheet = serde_json::from_str(json).unwrap();

        assert_eq!(spreadsheet.sheets[0].properties.sheet_id, 0);
        assert_eq!(spreadsheet.sheets[1].properties.sheet_id, 917);
    }
}
