use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

pub const CONFIG_PATH_VAR: &str = "ORDER_SHEET_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Sheets,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Service-account JSON key. Ignored when `bearer_token` is set.
    pub credentials_path: Option<PathBuf>,
    pub bearer_token: Option<String>,
    pub api_base: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            worksheet: "Sheet1".into(),
            credentials_path: None,
            bearer_token: None,
            api_base: sheets::DEFAULT_API_BASE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_bind: String,
    pub store: StoreBackend,
    pub database_url: String,
    pub sheets: SheetsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            store: StoreBackend::Sqlite,
            database_url: "sqlite://./data/orders.db".into(),
            sheets: SheetsSettings::default(),
        }
    }
}

/// Reads `server.toml` (or the file named by `ORDER_SHEET_CONFIG`), then
/// `APP__*` environment variables, e.g. `APP__SHEETS__SPREADSHEET_ID`.
pub fn load_settings() -> anyhow::Result<Settings> {
    let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut settings = load_settings_from(Path::new(&path))?;
    apply_legacy_env(&mut settings);
    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("failed to read configuration from '{}'", path.display()))?
        .try_deserialize()
        .context("invalid configuration")
}

fn apply_legacy_env(settings: &mut Settings) {
    if env::var("APP__SERVER_BIND").is_err() {
        if let Ok(v) = env::var("SERVER_BIND") {
            settings.server_bind = v;
        }
    }
    if env::var("APP__DATABASE_URL").is_err() {
        if let Ok(v) = env::var("DATABASE_URL") {
            settings.database_url = v;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
