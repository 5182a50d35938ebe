use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use server_api::{render, run_cycle, Action, CycleOutcome, Notice, SyncContext};
use shared::{
    domain::{RowIndex, Table},
    protocol::{DeleteForm, OrderForm},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::form_urlencoded;

mod app_state;
mod config;
mod page;
mod store;

use app_state::AppState;
use config::load_settings;
use page::{load_error_page, orders_page, OrdersPage};
use store::open_store;

const MAX_FORM_BYTES: usize = 16 * 1024;

/// Notice parameters set by the post-mutation redirect. Both are taken as
/// text so a mangled link still renders the page, just without a notice.
#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    saved: Option<String>,
    deleted: Option<String>,
}

impl PageQuery {
    fn notice(self) -> Option<Notice> {
        if let Some(item) = self.saved.filter(|item| !item.trim().is_empty()) {
            return Some(Notice::Saved { item });
        }
        self.deleted
            .and_then(|raw| raw.trim().parse().ok())
            .map(|index| Notice::Deleted {
                index: RowIndex(index),
            })
    }
}

/// A saved notice is only echoed for an item that is actually in the table.
fn confirmed_notice(notice: Option<Notice>, table: &Table) -> Option<Notice> {
    notice.filter(|notice| match notice {
        Notice::Saved { item } => table.rows().iter().any(|row| &row.item == item),
        Notice::Deleted { .. } => true,
    })
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let store = open_store(&settings).await;
    let state = AppState {
        sync: SyncContext::new(store),
        today: local_today,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, backend = ?settings.store, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(show_orders))
        .route("/orders", post(submit_order))
        .route("/orders/delete", post(delete_order))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn show_orders(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> Response {
    let today = (state.today)();
    let outcome = run_cycle(&state.sync, None, today).await;
    respond(outcome, q.notice(), today)
}

async fn submit_order(
    State(state): State<Arc<AppState>>,
    Form(form): Form<OrderForm>,
) -> Response {
    let today = (state.today)();
    let outcome = run_cycle(&state.sync, Some(Action::Append(form)), today).await;
    respond(outcome, None, today)
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let today = (state.today)();
    let action = Action::Delete(RowIndex(form.row_index));
    let outcome = run_cycle(&state.sync, Some(action), today).await;
    respond(outcome, None, today)
}

/// Where the browser goes after a successful mutation, so the table is read
/// again from the store.
fn reload_location(notice: &Notice) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    match notice {
        Notice::Saved { item } => query.append_pair("saved", item),
        Notice::Deleted { index } => query.append_pair("deleted", &index.0.to_string()),
    };
    format!("/?{}", query.finish())
}

fn respond(outcome: CycleOutcome, notice: Option<Notice>, today: NaiveDate) -> Response {
    match outcome {
        CycleOutcome::LoadFailed { error } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(load_error_page(&error)),
        )
            .into_response(),
        CycleOutcome::Mutated { notice } => Redirect::to(&reload_location(&notice)).into_response(),
        CycleOutcome::Rendered {
            table,
            warning,
            form,
        } => {
            let status = if warning.is_some() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::OK
            };
            let notice = confirmed_notice(notice, &table);
            let view = render(&table);
            let form = form.unwrap_or_else(|| OrderForm::blank(today));
            let html = orders_page(&OrdersPage {
                view: &view,
                form: &form,
                notice: notice.as_ref(),
                warning: warning.as_ref(),
                error: None,
            });
            (status, Html(html)).into_response()
        }
        CycleOutcome::WriteFailed { table, error, form } => {
            let view = render(&table);
            let form = form.unwrap_or_else(|| OrderForm::blank(today));
            let html = orders_page(&OrdersPage {
                view: &view,
                form: &form,
                notice: None,
                warning: None,
                error: Some(&error),
            });
            (StatusCode::BAD_GATEWAY, Html(html)).into_response()
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
