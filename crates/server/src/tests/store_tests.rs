use super::*;
use crate::config::SheetsSettings;

#[tokio::test]
async fn unavailable_store_fails_reads_and_writes_with_reason() {
    let store = UnavailableStore::new("credentials file missing");
    let err = store.read().await.expect_err("read");
    assert_eq!(err.to_string(), "credentials file missing");
    assert!(store.update(&Table::default()).await.is_err());
}

#[tokio::test]
async fn sheets_backend_without_spreadsheet_id_degrades_to_unavailable() {
    let settings = Settings {
        store: StoreBackend::Sheets,
        ..Settings::default()
    };
    let store = open_store(&settings).await;
    let err = store.read().await.expect_err("read");
    assert!(err.to_string().contains("spreadsheet_id"));
}

#[tokio::test]
async fn sheets_backend_without_credentials_is_reported() {
    let settings = Settings {
        store: StoreBackend::Sheets,
        sheets: SheetsSettings {
            spreadsheet_id: "1AbC".into(),
            ..SheetsSettings::default()
        },
        ..Settings::default()
    };
    let err = try_open_store(&settings).await.err().expect("must fail");
    assert!(err.to_string().contains("credentials_path"));
}

#[tokio::test]
async fn sqlite_backend_opens_a_working_store() {
    let settings = Settings {
        database_url: "sqlite::memory:".into(),
        ..Settings::default()
    };
    let store = try_open_store(&settings).await.expect("open");
    assert!(store.read().await.expect("read").is_empty());
}
