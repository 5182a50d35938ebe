use chrono::NaiveDate;
use server_api::SyncContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sync: SyncContext,
    pub(crate) today: fn() -> NaiveDate,
}
