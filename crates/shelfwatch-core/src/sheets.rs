//! Spreadsheet backend contract and the Google Sheets implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::grid::{BatchUpdate, CellFormat};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SheetsError {
    #[error("spreadsheet transport error: {0}")]
    Transport(String),
    #[error("spreadsheet api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("spreadsheet response could not be decoded: {0}")]
    Decode(String),
    #[error("sheet '{title}' not found")]
    SheetNotFound { title: String },
}

/// Spreadsheet operations the synchronizer and config loader rely on.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Writes every range of `update` in one request.
    async fn batch_update(&self, spreadsheet_id: &str, update: &BatchUpdate) -> Result<(), SheetsError>;

    async fn format_cells(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        formats: &[CellFormat],
    ) -> Result<(), SheetsError>;

    /// Cell text of `range`; trailing empty cells and rows may be missing.
    async fn read_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError>;
}

/// Sheets v4 REST client authenticated with a caller-supplied bearer token.
#[derive(Clone)]
pub struct GoogleSheetsBackend {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
}

impl GoogleSheetsBackend {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            base_url: SHEETS_API.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn auth(&self) -> HttpAuth {
        HttpAuth::BearerToken(self.access_token.clone())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SheetsError> {
        let response = self
            .http_client
            .execute(request.with_auth(self.auth()))
            .await
            .map_err(|error| SheetsError::Transport(error.message().to_owned()))?;
        if !response.is_success() {
            return Err(SheetsError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    async fn sheet_id(&self, spreadsheet_id: &str, title: &str) -> Result<i64, SheetsError> {
        let request = HttpRequest::get(format!("{}/{spreadsheet_id}", self.base_url))
            .with_query("fields", "sheets.properties");
        let response = self.send(request).await?;
        let body: Value =
            serde_json::from_str(&response.body).map_err(|error| SheetsError::Decode(error.to_string()))?;

        body.get("sheets")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|sheet| sheet.get("properties"))
            .find(|properties| properties.get("title").and_then(Value::as_str) == Some(title))
            .and_then(|properties| properties.get("sheetId").and_then(Value::as_i64))
            .ok_or_else(|| SheetsError::SheetNotFound {
                title: title.to_owned(),
            })
    }
}

#[async_trait]
impl SheetsBackend for GoogleSheetsBackend {
    async fn batch_update(&self, spreadsheet_id: &str, update: &BatchUpdate) -> Result<(), SheetsError> {
        let body = json!({
            "valueInputOption": "USER_ENTERED",
            "data": update.data,
        });
        let request = HttpRequest::post(format!("{}/{spreadsheet_id}/values:batchUpdate", self.base_url))
            .with_json_body(&body);
        self.send(request).await?;
        tracing::debug!(ranges = update.len(), "values batch update accepted");
        Ok(())
    }

    async fn format_cells(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        formats: &[CellFormat],
    ) -> Result<(), SheetsError> {
        if formats.is_empty() {
            return Ok(());
        }
        let sheet_id = self.sheet_id(spreadsheet_id, sheet).await?;
        let requests: Vec<Value> = formats
            .iter()
            .map(|format| repeat_cell(sheet_id, format))
            .collect();
        let request = HttpRequest::post(format!("{}/{spreadsheet_id}:batchUpdate", self.base_url))
            .with_json_body(&json!({ "requests": requests }));
        self.send(request).await?;
        Ok(())
    }

    async fn read_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let request = HttpRequest::get(format!(
            "{}/{spreadsheet_id}/values/{}",
            self.base_url,
            urlencoding::encode(range)
        ));
        let response = self.send(request).await?;
        let body: Value =
            serde_json::from_str(&response.body).map_err(|error| SheetsError::Decode(error.to_string()))?;

        let rows = body
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `repeatCell` request; grid ranges are 0-based and end-exclusive.
fn repeat_cell(sheet_id: i64, format: &CellFormat) -> Value {
    let (red, green, blue) = format.style.background();
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": format.first_row.saturating_sub(1),
                "endRowIndex": format.last_row,
                "startColumnIndex": format.first_column.saturating_sub(1),
                "endColumnIndex": format.last_column,
            },
            "cell": {
                "userEnteredFormat": {
                    "backgroundColor": { "red": red, "green": green, "blue": blue },
                    "textFormat": { "bold": true },
                }
            },
            "fields": "userEnteredFormat(backgroundColor,textFormat)",
        }
    })
}
