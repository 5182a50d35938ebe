use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use sheets::{ServiceAccountKey, SheetsAuth, SheetsConfig, SheetsTableStore};
use shared::domain::Table;
use storage::{SqliteTableStore, TableStore};
use tracing::{error, info};

use crate::config::{Settings, StoreBackend};

/// Stands in for a store that could not be opened, so every page load shows
/// the connection diagnostic instead of the server refusing to start.
pub(crate) struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TableStore for UnavailableStore {
    async fn read(&self) -> anyhow::Result<Table> {
        bail!("{}", self.reason)
    }

    async fn update(&self, _table: &Table) -> anyhow::Result<()> {
        bail!("{}", self.reason)
    }
}

pub(crate) async fn open_store(settings: &Settings) -> Arc<dyn TableStore> {
    match try_open_store(settings).await {
        Ok(store) => store,
        Err(err) => {
            error!(
                backend = ?settings.store,
                error = %format!("{err:#}"),
                "failed to open order store; pages will show the connection diagnostic"
            );
            Arc::new(UnavailableStore::new(format!("{err:#}")))
        }
    }
}

async fn try_open_store(settings: &Settings) -> anyhow::Result<Arc<dyn TableStore>> {
    match settings.store {
        StoreBackend::Sqlite => {
            let store = SqliteTableStore::open(&settings.database_url)
                .await
                .with_context(|| format!("failed to open '{}'", settings.database_url))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Sheets => {
            let sheets = &settings.sheets;
            if sheets.spreadsheet_id.trim().is_empty() {
                bail!("sheets.spreadsheet_id is not configured");
            }
            let auth = match (&sheets.bearer_token, &sheets.credentials_path) {
                (Some(token), _) => SheetsAuth::bearer(token.clone()),
                (None, Some(path)) => {
                    SheetsAuth::service_account(ServiceAccountKey::from_file(path)?)
                }
                (None, None) => {
                    bail!("neither sheets.credentials_path nor sheets.bearer_token is configured")
                }
            };
            let config = SheetsConfig {
                api_base: sheets.api_base.clone(),
                spreadsheet_id: sheets.spreadsheet_id.clone(),
                worksheet: sheets.worksheet.clone(),
            };
            info!(
                spreadsheet_id = %config.spreadsheet_id,
                worksheet = %config.worksheet,
                "using sheets order store"
            );
            Ok(Arc::new(SheetsTableStore::new(config, auth)))
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
