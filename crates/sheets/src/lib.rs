//! Google Sheets backed `TableStore`.
//!
//! The worksheet's first row is the header. Reads fetch formatted values so
//! every cell arrives as display text; writes use `RAW` input so dates stay
//! `YYYY-MM-DD` strings. An overwrite is one `PUT` from `A1` carrying the
//! header, the rows, and blank rows down to the previously occupied extent.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{OrderRow, Table, COLUMNS},
    error::RowDecodeError,
};
use storage::TableStore;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub mod auth;

pub use auth::{ServiceAccountKey, SheetsAuth};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
const LAST_COLUMN: char = (b'A' + COLUMNS.len() as u8 - 1) as char;
const QUANTITY_COLUMN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
        }
    }

    fn quoted_worksheet(&self) -> String {
        format!("'{}'", self.worksheet.replace('\'', "''"))
    }

    pub(crate) fn table_range(&self) -> String {
        format!("{}!A1:{LAST_COLUMN}", self.quoted_worksheet())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SheetsError {
    #[error("worksheet '{worksheet}' has no header row")]
    MissingHeader { worksheet: String },
    #[error("header row of worksheet '{worksheet}' has no '{column}' column")]
    MissingColumn {
        worksheet: String,
        column: &'static str,
    },
    #[error(transparent)]
    Row(#[from] RowDecodeError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsTableStore {
    client: Client,
    config: SheetsConfig,
    auth: SheetsAuth,
}

impl SheetsTableStore {
    pub fn new(config: SheetsConfig, auth: SheetsAuth) -> Self {
        Self::with_client(Client::new(), config, auth)
    }

    pub fn with_client(client: Client, config: SheetsConfig, auth: SheetsAuth) -> Self {
        Self {
            client,
            config,
            auth,
        }
    }

    fn values_url(&self, range: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .with_context(|| format!("invalid sheets api base '{}'", self.config.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets api base '{}' cannot hold a path", self.config.api_base))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range,
            ]);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Every non-empty row of the table range, header included.
    async fn fetch_values(&self, token: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.values_url(
            &self.config.table_range(),
            &[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ],
        )?;

        let response: ValueRange = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("sheets api unreachable")?
            .error_for_status()
            .context("sheets api rejected the read")?
            .json()
            .await
            .context("sheets api returned an unexpected body")?;
        Ok(response.values)
    }
}

#[async_trait]
impl TableStore for SheetsTableStore {
    async fn read(&self) -> Result<Table> {
        let token = self.auth.access_token(&self.client).await?;
        let values = self.fetch_values(&token).await?;
        let table = decode_table(&self.config.worksheet, &values)?;
        debug!(
            spreadsheet_id = %self.config.spreadsheet_id,
            rows = table.len(),
            "read orders from sheet"
        );
        Ok(table)
    }

    async fn update(&self, table: &Table) -> Result<()> {
        let token = self.auth.access_token(&self.client).await?;
        let extent = self
            .fetch_values(&token)
            .await
            .context("failed to measure the stored table before writing")?
            .len();
        let range = self.config.table_range();
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: encode_table(table, extent),
        };

        self.client
            .put(self.values_url(&range, &[("valueInputOption", "RAW")])?)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .context("sheets api unreachable")?
            .error_for_status()
            .context("sheets api rejected the write")?;

        info!(
            spreadsheet_id = %self.config.spreadsheet_id,
            rows = table.len(),
            blanked = body.values.len().saturating_sub(table.len() + 1),
            "overwrote orders in sheet"
        );
        Ok(())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn decode_table(worksheet: &str, values: &[Vec<Value>]) -> Result<Table, SheetsError> {
    let mut rows = values.iter();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    if header.iter().all(String::is_empty) {
        return Err(SheetsError::MissingHeader {
            worksheet: worksheet.to_string(),
        });
    }

    let mut positions = [0usize; COLUMNS.len()];
    for (slot, column) in positions.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .ok_or_else(|| SheetsError::MissingColumn {
                worksheet: worksheet.to_string(),
                column,
            })?;
    }

    let mut table = Vec::new();
    for cells in rows {
        let text: Vec<String> = cells.iter().map(cell_text).collect();
        if text.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let ordered: Vec<&str> = positions
            .iter()
            .map(|&position| text.get(position).map(String::as_str).unwrap_or(""))
            .collect();
        table.push(OrderRow::from_cells(table.len(), &ordered)?);
    }
    Ok(Table::new(table))
}

/// Header plus rows, padded with blank rows down to `extent` so a single
/// write also erases rows a longer previous table left behind.
pub(crate) fn encode_table(table: &Table, extent: usize) -> Vec<Vec<Value>> {
    let mut values = Vec::with_capacity(extent.max(table.len() + 1));
    values.push(COLUMNS.iter().map(|c| Value::from(*c)).collect());
    for row in table.rows() {
        let cells = row
            .to_cells()
            .into_iter()
            .enumerate()
            .map(|(column, cell)| {
                if column == QUANTITY_COLUMN {
                    Value::from(row.quantity)
                } else {
                    Value::from(cell)
                }
            })
            .collect();
        values.push(cells);
    }
    while values.len() < extent {
        values.push(vec![Value::from(""); COLUMNS.len()]);
    }
    values
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
