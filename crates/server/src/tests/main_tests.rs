use super::*;
use axum::{
    body::{self, Body},
    http::{header, Request, Response},
};
use shared::{
    domain::{CarModel, ProductSearch},
    error::{ApiError, ErrorCode},
};
use tower::ServiceExt;
use wizard::CatalogLookup;

use crate::config::Settings;

const FORM: &str = "application/x-www-form-urlencoded";

async fn test_app() -> (Router, Arc<AppState>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.seed_default_catalog().await.expect("seed");
    let state = Arc::new(AppState::new(storage, &Settings::default()));
    (build_router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("response")
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

/// `NAME=value` from the response's `Set-Cookie`, if one was issued.
fn issued_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(';').next())
        .map(str::to_string)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_form(uri: &str, cookie: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from(form.to_string()))
        .expect("request")
}

async fn start_session(app: &Router) -> String {
    let response = send(app, get("/order/step1", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    issued_cookie(&response).expect("session cookie")
}

async fn bmw_x5(state: &AppState) -> (i64, i64) {
    let bmw = state
        .storage
        .list_makes()
        .await
        .expect("makes")
        .into_iter()
        .find(|make| make.name == "BMW")
        .expect("bmw");
    let x5 = state
        .storage
        .list_models_for_make(bmw.id)
        .await
        .expect("models")
        .into_iter()
        .find(|model| model.name == "X5")
        .expect("x5");
    (bmw.id.0, x5.id.0)
}

async fn complete_steps_one_to_four(app: &Router, state: &AppState, cookie: &str) {
    let (make_id, model_id) = bmw_x5(state).await;
    let steps = [
        (
            "/order/step1",
            format!("productCategory=SUV&makeId={make_id}&modelId={model_id}&quantity=2"),
            "/order/step2",
        ),
        (
            "/order/step2",
            "color=Black&interior=Leather&tireType=Winter".to_string(),
            "/order/step3",
        ),
        (
            "/order/step3",
            "deliveryAddress=1+Main+St&contactName=Ada&contactEmail=ada%40example.com&contactPhone=555-0100"
                .to_string(),
            "/order/step4",
        ),
        (
            "/order/step4",
            "paymentMethod=Card&billingAddress=1+Main+St".to_string(),
            "/order/step5",
        ),
    ];
    for (uri, form, next) in steps {
        let response = send(app, post_form(uri, cookie, &form)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), next);
    }
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _state) = test_app().await;
    let response = send(&app, get("/healthz", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn order_entry_redirects_to_first_step() {
    let (app, _state) = test_app().await;
    let response = send(&app, get("/order", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/order/step1");
}

#[tokio::test]
async fn step_one_lists_makes_and_issues_a_session_cookie() {
    let (app, _state) = test_app().await;
    let response = send(&app, get("/order/step1", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = issued_cookie(&response).expect("cookie");
    assert!(cookie.starts_with("WIZARD_SESSION="));

    let html = body_text(response).await;
    for make in ["BMW", "Mercedes-Benz", "Audi", "Volkswagen", "Porsche"] {
        assert!(html.contains(make), "{make} missing");
    }

    let again = send(&app, get("/order/step1", Some(&cookie))).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert!(issued_cookie(&again).is_none(), "live session is reused");
}

#[tokio::test]
async fn skipping_ahead_redirects_to_step_one() {
    let (app, _state) = test_app().await;
    for uri in ["/order/step3", "/order/step5"] {
        let response = send(&app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/order/step1");
    }
}

#[tokio::test]
async fn full_flow_confirms_once_and_shows_receipt() {
    let (app, state) = test_app().await;
    let cookie = start_session(&app).await;
    complete_steps_one_to_four(&app, &state, &cookie).await;

    let summary = send(&app, get("/order/step5", Some(&cookie))).await;
    assert_eq!(summary.status(), StatusCode::OK);
    let html = body_text(summary).await;
    assert!(html.contains("X5"));
    assert!(html.contains("ada@example.com"));

    let confirm = send(&app, post_form("/order/step5", &cookie, "")).await;
    assert_eq!(confirm.status(), StatusCode::SEE_OTHER);
    let success = location(&confirm).to_string();
    assert!(success.starts_with("/order/success?orderId="));

    let duplicate = send(&app, post_form("/order/step5", &cookie, "")).await;
    assert_eq!(duplicate.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&duplicate), success);
    assert_eq!(
        state.storage.list_recent_orders(10).await.expect("orders").len(),
        1
    );

    let receipt = send(&app, get(&success, None)).await;
    assert_eq!(receipt.status(), StatusCode::OK);
    let html = body_text(receipt).await;
    assert!(html.contains("BMW"));
    assert!(html.contains("Winter"));
    assert!(html.contains("confirmed"));

    let after = send(&app, get("/order/step2", Some(&cookie))).await;
    assert_eq!(location(&after), "/order/step1");
}

#[tokio::test]
async fn invalid_step_rerenders_with_messages_and_keeps_draft() {
    let (app, _state) = test_app().await;
    let cookie = start_session(&app).await;

    let response = send(
        &app,
        post_form("/order/step1", &cookie, "makeId=abc&quantity=0"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Product category is required"));
    assert!(html.contains("Invalid make ID"));
    assert!(html.contains("Quantity must be at least 1"));

    let next = send(&app, get("/order/step2", Some(&cookie))).await;
    assert_eq!(next.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&next), "/order/step1");
}

#[tokio::test]
async fn invalid_email_is_reported_on_step_three() {
    let (app, state) = test_app().await;
    let cookie = start_session(&app).await;
    let (make_id, model_id) = bmw_x5(&state).await;
    send(
        &app,
        post_form(
            "/order/step1",
            &cookie,
            &format!("productCategory=SUV&makeId={make_id}&modelId={model_id}&quantity=1"),
        ),
    )
    .await;
    send(
        &app,
        post_form("/order/step2", &cookie, "color=Red&interior=Cloth&tireType=Summer"),
    )
    .await;

    let response = send(
        &app,
        post_form(
            "/order/step3",
            &cookie,
            "deliveryAddress=x&contactName=y&contactEmail=not-an-email&contactPhone=1",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response)
        .await
        .contains("Please provide a valid email"));
}

#[tokio::test]
async fn expired_session_cookie_gets_a_fresh_session() {
    let (app, state) = test_app().await;
    let stale = state.storage.create_session().await.expect("session");
    state.storage.expire_session(&stale).await.expect("expire");

    let cookie = format!("WIZARD_SESSION={stale}");
    let response = send(&app, get("/order/step1", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let fresh = issued_cookie(&response).expect("new cookie");
    assert_ne!(fresh, cookie);

    let garbage = send(&app, get("/order/step1", Some("WIZARD_SESSION=nope"))).await;
    assert!(issued_cookie(&garbage).is_some());
}

#[tokio::test]
async fn models_endpoint_filters_by_make() {
    let (app, state) = test_app().await;
    let (make_id, _) = bmw_x5(&state).await;

    let response = send(&app, get(&format!("/order/api/models?makeId={make_id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let models: Vec<CarModel> = serde_json::from_slice(&body).expect("json");
    assert_eq!(models.len(), 5);
    assert!(models.iter().all(|model| model.make_id.0 == make_id));

    let unknown = send(&app, get("/order/api/models?makeId=424242", None)).await;
    assert_eq!(body_text(unknown).await, "[]");
}

#[tokio::test]
async fn model_options_fragment_follows_selected_make() {
    let (app, state) = test_app().await;
    let (make_id, _) = bmw_x5(&state).await;

    let response = send(
        &app,
        get(&format!("/order/api/models/options?makeId={make_id}"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.starts_with("<option value=\"\">-- choose --</option>"));
    assert_eq!(html.matches("<option value=").count(), 6);
    assert!(html.contains(">X5</option>"));

    for uri in ["/order/api/models/options?makeId=", "/order/api/models/options"] {
        let empty = body_text(send(&app, get(uri, None)).await).await;
        assert_eq!(empty, "<option value=\"\">-- choose --</option>", "{uri}");
    }
}

#[tokio::test]
async fn unknown_receipt_and_page_are_not_found() {
    let (app, _state) = test_app().await;

    let response = send(&app, get("/order/success?orderId=999", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let error: ApiError = serde_json::from_slice(&body).expect("json");
    assert_eq!(error.code, ErrorCode::NotFound);

    let page = send(&app, get("/order/step9", None)).await;
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn htmx_item_post_returns_fresh_form_and_pushes_fragment() {
    let (app, state) = test_app().await;
    let mut subscription = state.live.subscribe();

    let request = Request::post("/items")
        .header(header::CONTENT_TYPE, FORM)
        .header("HX-Request", "true")
        .body(Body::from("name=Lamp&description=Brass"))
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.starts_with("<form id=\"item-form\""));
    assert!(!html.contains("Lamp"));

    let pushed = subscription.try_recv().expect("fragment pushed");
    assert!(pushed.starts_with("<li"));
    assert!(pushed.contains("Lamp"));
    assert!(pushed.contains("Brass"));
}

#[tokio::test]
async fn plain_item_post_redirects_and_lists_newest_first() {
    let (app, _state) = test_app().await;
    for name in ["First", "Second"] {
        let request = Request::post("/items")
            .header(header::CONTENT_TYPE, FORM)
            .body(Body::from(format!("name={name}")))
            .expect("request");
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    let html = body_text(send(&app, get("/", None)).await).await;
    let first = html.find("First").expect("first");
    let second = html.find("Second").expect("second");
    assert!(second < first);
}

#[tokio::test]
async fn invalid_item_is_not_stored_or_pushed() {
    let (app, state) = test_app().await;
    let mut subscription = state.live.subscribe();

    let request = Request::post("/items")
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from("name=&description=x"))
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Name is required"));

    assert!(subscription.try_recv().is_none());
    assert!(state.storage.list_items().await.expect("items").is_empty());
}

#[tokio::test]
async fn item_stream_registers_a_subscriber_until_dropped() {
    let (app, state) = test_app().await;
    let response = send(&app, get("/items/stream", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );
    assert_eq!(state.live.subscriber_count(), 1);

    drop(response);
    assert_eq!(state.live.subscriber_count(), 0);
}

fn htmx(method: &str, uri: &str, form: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("HX-Request", "true");
    match form {
        Some(form) => builder
            .header(header::CONTENT_TYPE, FORM)
            .body(Body::from(form.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

#[tokio::test]
async fn todo_add_edit_toggle_delete_over_htmx() {
    let (app, state) = test_app().await;

    let created = send(&app, htmx("POST", "/todos", Some("text=Buy+milk"))).await;
    assert_eq!(created.status(), StatusCode::OK);
    let section = body_text(created).await;
    assert!(section.contains("id=\"todo-form\""));
    assert!(section.contains("<span>Buy milk</span>"));
    let todo = state.storage.list_todos().await.expect("todos").remove(0);
    let id = todo.id;

    let edit = body_text(send(&app, htmx("GET", &format!("/todos/{id}/edit"), None)).await).await;
    assert!(edit.contains(&format!("hx-put=\"/todos/{id}\"")));
    assert!(edit.contains("value=\"Buy milk\""));

    let renamed = send(
        &app,
        htmx("PUT", &format!("/todos/{id}"), Some("text=Buy+oat+milk")),
    )
    .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    assert!(body_text(renamed).await.contains("<span>Buy oat milk</span>"));

    let toggled = body_text(send(&app, htmx("PUT", &format!("/todos/{id}/toggle"), None)).await).await;
    assert!(toggled.contains(" checked"));
    assert!(state.storage.find_todo(id).await.expect("find").expect("todo").done);

    let deleted = send(&app, htmx("DELETE", &format!("/todos/{id}"), None)).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(body_text(deleted).await.is_empty());
    assert!(state.storage.list_todos().await.expect("todos").is_empty());
}

#[tokio::test]
async fn blank_todo_is_ignored_and_plain_post_redirects() {
    let (app, state) = test_app().await;

    let blank = send(&app, htmx("POST", "/todos", Some("text=+++"))).await;
    assert_eq!(blank.status(), StatusCode::OK);
    assert!(body_text(blank).await.contains("id=\"todo-list\""));
    assert!(state.storage.list_todos().await.expect("todos").is_empty());

    let plain = Request::post("/todos")
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from("text=Walk+dog"))
        .expect("request");
    let response = send(&app, plain).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/todos");

    let page = body_text(send(&app, get("/todos", None)).await).await;
    assert!(page.contains("<span>Walk dog</span>"));
}

#[tokio::test]
async fn todo_rename_to_blank_is_rejected_and_unknown_todo_is_not_found() {
    let (app, state) = test_app().await;
    let todo = state.storage.insert_todo("Keep me").await.expect("todo");

    let blank = send(
        &app,
        htmx("PUT", &format!("/todos/{}", todo.id), Some("text=")),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(blank).await.contains("Text is required"));
    assert_eq!(
        state.storage.find_todo(todo.id).await.expect("find"),
        Some(todo)
    );

    for (method, uri) in [
        ("GET", "/todos/999/edit"),
        ("PUT", "/todos/999/toggle"),
    ] {
        let response = send(&app, htmx(method, uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn product_page_lists_first_page_and_categories() {
    let (app, state) = test_app().await;
    state.storage.seed_sample_products().await.expect("seed");

    let response = send(&app, get("/products", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("id=\"product-filters\""));
    assert!(html.contains("<option value=\"Books\">Books</option>"));
    assert!(html.contains("150 product(s), page 1 of 15"));
    assert_eq!(html.matches("<tr id=\"product-").count(), 10);
    assert!(html.contains(">Next</a>"));
    assert!(!html.contains(">Previous</a>"));
}

#[tokio::test]
async fn product_table_applies_filters_and_paging() {
    let (app, state) = test_app().await;
    state.storage.seed_sample_products().await.expect("seed");

    let html = body_text(
        send(
            &app,
            get("/products/table?category=Books&page=1&sortBy=price&direction=desc", None),
        )
        .await,
    )
    .await;
    assert!(html.starts_with("<div id=\"product-results\">"));
    assert!(!html.contains("<h1>"));
    assert!(html.contains("15 product(s), page 2 of 2"));
    assert_eq!(html.matches("<tr id=\"product-").count(), 5);
    assert!(html.contains(">Previous</a>"));
    assert!(html.contains("category=Books"));

    let odd = body_text(
        send(
            &app,
            get("/products/table?page=abc&sortBy=bogus&direction=up", None),
        )
        .await,
    )
    .await;
    assert!(odd.contains("150 product(s), page 1 of 15"));
}

#[tokio::test]
async fn deleting_a_product_rerenders_the_same_query() {
    let (app, state) = test_app().await;
    state.storage.seed_sample_products().await.expect("seed");
    let search = ProductSearch {
        category: Some("Toys".into()),
        ..ProductSearch::default()
    };
    let victim = state
        .storage
        .search_products(&search)
        .await
        .expect("search")
        .products
        .remove(0);

    let response = send(
        &app,
        htmx(
            "DELETE",
            &format!("/products/{}?category=Toys", victim.id),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("14 product(s)"));
    assert!(!html.contains(&format!("id=\"product-{}\"", victim.id)));
}
