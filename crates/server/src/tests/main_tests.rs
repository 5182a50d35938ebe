use super::*;
use axum::{body, body::Body, http::header, http::Request};
use shared::domain::{OrderInput, OrderRow};
use storage::{SqliteTableStore, TableStore};
use tower::ServiceExt;

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("date")
}

fn row(item: &str) -> OrderRow {
    OrderRow::from_input(
        OrderInput::new("Site A", item, fixed_today()),
        fixed_today(),
    )
}

async fn test_app(rows: Vec<OrderRow>) -> (Router, Arc<SqliteTableStore>) {
    let store = Arc::new(SqliteTableStore::open("sqlite::memory:").await.expect("db"));
    store.update(&Table::new(rows)).await.expect("seed");
    let app = build_router(Arc::new(AppState {
        sync: SyncContext::new(store.clone()),
        today: fixed_today,
    }));
    (app, store)
}

async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _store) = test_app(Vec::new()).await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn empty_store_renders_empty_state_and_form() {
    let (app, _store) = test_app(Vec::new()).await;
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(server_api::EMPTY_TABLE_MESSAGE));
    assert!(html.contains("Save to sheet"));
}

#[tokio::test]
async fn submit_appends_and_redirects_to_reload() {
    let (app, store) = test_app(vec![row("Cement")]).await;
    let response = app
        .clone()
        .oneshot(form_post(
            "/orders",
            "site_name=Site+A&address=&company=&manager=&phone=&item=Rebar&quantity=10&delivery_date=2024-06-01",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/?saved=Rebar"
    );

    let table = store.read().await.expect("read");
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.rows()[1].to_cells(),
        ["2026-10-16", "Site A", "", "", "", "", "Rebar", "10", "2024-06-01"]
    );

    let reload = Request::get("/?saved=Rebar")
        .body(Body::empty())
        .expect("request");
    let html = body_text(app.oneshot(reload).await.expect("response")).await;
    assert!(html.contains("Rebar order saved"));
    assert!(html.contains("<option value=\"1\">1</option>"));
}

#[tokio::test]
async fn submit_without_item_warns_and_keeps_input() {
    let (app, store) = test_app(Vec::new()).await;
    let response = app
        .oneshot(form_post("/orders", "site_name=North+Yard&item=&quantity=3"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Site name and item are required fields."));
    assert!(html.contains("value=\"North Yard\""));
    assert!(store.read().await.expect("read").is_empty());
}

#[tokio::test]
async fn delete_removes_selected_row_and_redirects() {
    let (app, store) = test_app(vec![row("a"), row("b"), row("c")]).await;
    let response = app
        .oneshot(form_post("/orders/delete", "row_index=1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/?deleted=1"
    );

    let items: Vec<String> = store
        .read()
        .await
        .expect("read")
        .into_rows()
        .into_iter()
        .map(|r| r.item)
        .collect();
    assert_eq!(items, ["a", "c"]);
}

#[tokio::test]
async fn delete_with_stale_index_warns() {
    let (app, store) = test_app(vec![row("a")]).await;
    let response = app
        .oneshot(form_post("/orders/delete", "row_index=4"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.read().await.expect("read").len(), 1);
}

#[tokio::test]
async fn unreachable_store_shows_diagnostic_and_ignores_submission() {
    let app = build_router(Arc::new(AppState {
        sync: SyncContext::new(Arc::new(store::UnavailableStore::new(
            "connection refused",
        ))),
        today: fixed_today,
    }));
    let response = app
        .oneshot(form_post("/orders", "site_name=Site+A&item=Rebar"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let html = body_text(response).await;
    assert!(html.contains("connection refused"));
    assert!(!html.contains("<form"));
}

#[tokio::test]
async fn malformed_deleted_parameter_still_renders_the_page() {
    let (app, _store) = test_app(vec![row("Cement")]).await;
    let request = Request::get("/?deleted=abc")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Cement"));
    assert!(!html.contains("class=\"notice\""));
}

#[tokio::test]
async fn saved_notice_for_unknown_item_is_not_shown() {
    let (app, _store) = test_app(vec![row("Cement")]).await;
    let request = Request::get("/?saved=Free+money")
        .body(Body::empty())
        .expect("request");
    let html = body_text(app.clone().oneshot(request).await.expect("response")).await;
    assert!(!html.contains("Free money"));
    assert!(!html.contains("class=\"notice\""));

    let request = Request::get("/?saved=Cement")
        .body(Body::empty())
        .expect("request");
    let html = body_text(app.oneshot(request).await.expect("response")).await;
    assert!(html.contains("Cement order saved"));
}

#[test]
fn page_query_ignores_unparsable_row_numbers() {
    let query = PageQuery {
        saved: None,
        deleted: Some("abc".into()),
    };
    assert_eq!(query.notice(), None);
    let query = PageQuery {
        saved: None,
        deleted: Some("2".into()),
    };
    assert_eq!(
        query.notice(),
        Some(Notice::Deleted { index: RowIndex(2) })
    );
}

#[test]
fn reload_location_encodes_item_names() {
    let notice = Notice::Saved {
        item: "Steel & wire".into(),
    };
    assert_eq!(reload_location(&notice), "/?saved=Steel+%26+wire");
}

struct RejectingStore {
    table: Table,
}

#[async_trait::async_trait]
impl TableStore for RejectingStore {
    async fn read(&self) -> anyhow::Result<Table> {
        Ok(self.table.clone())
    }

    async fn update(&self, _table: &Table) -> anyhow::Result<()> {
        anyhow::bail!("quota exceeded")
    }
}

#[tokio::test]
async fn rejected_write_shows_error_without_redirect() {
    let app = build_router(Arc::new(AppState {
        sync: SyncContext::new(Arc::new(RejectingStore {
            table: Table::new(vec![row("Cement")]),
        })),
        today: fixed_today,
    }));
    let response = app
        .oneshot(form_post("/orders", "site_name=Site+A&item=Rebar"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.headers().get(header::LOCATION).is_none());
    let html = body_text(response).await;
    assert!(html.contains("quota exceeded"));
    assert!(html.contains("Cement"));
    assert!(html.contains("value=\"Rebar\""));
}
