//! Integration tests for the order API.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::{Money, Part};
use event_bus::{InMemoryEventBus, Topic};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use saga::{InMemoryPaymentService, InMemoryStockService, MetricsOrderMetrics, OrderSaga};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    bus: InMemoryEventBus,
    payment: InMemoryPaymentService,
}

async fn setup() -> TestApp {
    let stock = InMemoryStockService::new();
    stock
        .upsert_part(Part::new("P1", "Engine", Money::from_cents(100), 10))
        .await;
    stock
        .upsert_part(Part::new("P2", "Hull", Money::from_cents(200), 10))
        .await;
    stock
        .upsert_part(Part::new("P0", "Wing", Money::from_cents(50), 0))
        .await;
    let payment = InMemoryPaymentService::new();
    let bus = InMemoryEventBus::new(1);

    let saga = OrderSaga::new(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(stock),
        Arc::new(payment.clone()),
        Arc::new(bus.clone()),
    )
    .with_metrics(Arc::new(MetricsOrderMetrics));

    let app = api::create_app(Arc::new(api::AppState { saga }), get_metrics_handle());
    TestApp { app, bus, payment }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-uuid", "u1")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-uuid", "u1")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_order(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            serde_json::json!({ "part_uuids": ["P1", "P2"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["order_uuid"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let TestApp { app, .. } = setup().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let TestApp { app, .. } = setup().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            serde_json::json!({ "part_uuids": ["P1", "P2"], "payment_method": "CARD" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["total_price"], 300);
    assert!(json["order_uuid"].as_str().is_some());
}

#[tokio::test]
async fn test_create_order_requires_identity() {
    let TestApp { app, .. } = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "part_uuids": ["P1"] }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_order_validation() {
    let TestApp { app, .. } = setup().await;

    let empty = app
        .clone()
        .oneshot(json_request("POST", "/orders", serde_json::json!({ "part_uuids": [] })))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(empty).await["error"], "No parts specified");

    let unknown_part = app
        .clone()
        .oneshot(json_request("POST", "/orders", serde_json::json!({ "part_uuids": ["P9"] })))
        .await
        .unwrap();
    assert_eq!(unknown_part.status(), StatusCode::NOT_FOUND);

    let out_of_stock = app
        .clone()
        .oneshot(json_request("POST", "/orders", serde_json::json!({ "part_uuids": ["P0"] })))
        .await
        .unwrap();
    assert_eq!(out_of_stock.status(), StatusCode::CONFLICT);

    let bad_method = app
        .oneshot(json_request(
            "POST",
            "/orders",
            serde_json::json!({ "part_uuids": ["P1"], "payment_method": "UNKNOWN" }),
        ))
        .await
        .unwrap();
    assert_eq!(bad_method.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let TestApp { app, .. } = setup().await;
    let order_id = create_order(&app).await;

    let response = app
        .oneshot(empty_request("GET", &format!("/orders/{order_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["order_uuid"], order_id.as_str());
    assert_eq!(json["user_uuid"], "u1");
    assert_eq!(json["part_uuids"], serde_json::json!(["P1", "P2"]));
    assert_eq!(json["total_price"], 300);
    assert_eq!(json["status"], "PENDING_PAYMENT");
    assert!(json["transaction_uuid"].is_null());
}

#[tokio::test]
async fn test_get_unknown_order() {
    let TestApp { app, .. } = setup().await;

    let missing = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/orders/00000000-0000-4000-8000-000000000000",
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed = app
        .oneshot(empty_request("GET", "/orders/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pay_order() {
    let TestApp { app, bus, .. } = setup().await;
    let order_id = create_order(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            serde_json::json!({ "payment_method": "CARD" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let transaction = body_json(response).await["transaction_uuid"]
        .as_str()
        .unwrap()
        .to_string();

    let order = body_json(
        app.clone()
            .oneshot(empty_request("GET", &format!("/orders/{order_id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["status"], "PAID");
    assert_eq!(order["transaction_uuid"], transaction.as_str());
    assert_eq!(order["payment_method"], "CARD");
    assert_eq!(bus.message_count(Topic::OrderPaid).await, 1);

    // Paying again is a conflict.
    let again = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            serde_json::json!({ "payment_method": "SBP" }),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pay_declined_is_bad_gateway() {
    let TestApp { app, payment, .. } = setup().await;
    let order_id = create_order(&app).await;
    payment.set_fail_on_charge(true).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            serde_json::json!({ "payment_method": "CARD" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let order = body_json(
        app.oneshot(empty_request("GET", &format!("/orders/{order_id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["status"], "PENDING_PAYMENT");
}

#[tokio::test]
async fn test_cancel_order() {
    let TestApp { app, .. } = setup().await;
    let order_id = create_order(&app).await;

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/orders/{order_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let order = body_json(
        app.clone()
            .oneshot(empty_request("GET", &format!("/orders/{order_id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["status"], "CANCELLED");

    let pay = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            serde_json::json!({ "payment_method": "CARD" }),
        ))
        .await
        .unwrap();
    assert_eq!(pay.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_paid_order_is_conflict() {
    let TestApp { app, .. } = setup().await;
    let order_id = create_order(&app).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            serde_json::json!({ "payment_method": "CARD" }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("POST", &format!("/orders/{order_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let TestApp { app, .. } = setup().await;
    create_order(&app).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_total"));
}
