//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::Sandbox;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use commit::CommitSettings;
use commit::gateways::InMemoryNotifier;
use domain::StateExpirations;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};
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
    sandbox: Sandbox,
    notifier: InMemoryNotifier,
}

async fn setup() -> TestApp {
    setup_with(CommitSettings::default()).await
}

async fn setup_with(settings: CommitSettings) -> TestApp {
    let notifier = InMemoryNotifier::new();
    let (state, sandbox) = api::create_default_state(
        InMemoryOrderStore::new(),
        settings,
        Arc::new(notifier.clone()),
    );
    let app = api::create_app(state, Some(sandbox.clone()), get_metrics_handle());
    let t = TestApp {
        app,
        sandbox,
        notifier,
    };

    let (status, _) = t
        .post(
            "/sandbox/fixtures",
            json!({
                "artworks": [{ "id": "artwork-a", "current_version_id": "version-a" }],
                "credit_cards": [{
                    "id": "cc-1",
                    "external_id": "card_1",
                    "customer_account": { "external_id": "cus_1" },
                }],
                "partners": [{
                    "id": "partner-1",
                    "name": "Pace",
                    "effective_commission_rate": 0.1,
                }],
                "merchant_accounts": [{
                    "id": "ma-1",
                    "partner_id": "partner-1",
                    "external_id": "acct_1",
                }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    t
}

/// A buy-now pickup order for one artwork, ready to submit.
fn order_request() -> Value {
    json!({
        "buyer_id": "user-1",
        "buyer_type": "user",
        "seller_id": "partner-1",
        "seller_type": "gallery",
        "currency_code": "USD",
        "credit_card_id": "cc-1",
        "fulfillment_type": "pickup",
        "line_items": [{
            "artwork_id": "artwork-a",
            "artwork_version_id": "version-a",
            "quantity": 1,
            "list_price_cents": 10_000,
        }],
    })
}

impl TestApp {
    async fn create_order(&self, body: Value) -> String {
        let (status, json) = self.post("/orders", body).await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    async fn commit(&self, order_id: &str, action: &str, user_id: &str) -> (StatusCode, Value) {
        self.post(
            &format!("/orders/{order_id}/commit"),
            json!({ "action": action, "user_id": user_id }),
        )
        .await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_json(response).await
    }
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;
    let (status, json) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_create_and_get_order() {
    let t = setup().await;
    let mut body = order_request();
    body["line_items"][0]["quantity"] = json!(2);
    body["line_items"][0]["edition_set_id"] = json!("ed-1");

    let (status, created) = t.post("/orders", body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "pending");
    assert_eq!(created["mode"], "buy");
    assert_eq!(created["total_list_price_cents"], 20_000);
    assert!(created["state_expires_at"].is_string());

    let (status, json) = t.get(&format!("/orders/{}", created["id"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);
    assert_eq!(json["line_items"][0]["artwork_id"], "artwork-a");
    assert_eq!(json["line_items"][0]["edition_set_id"], "ed-1");
}

#[tokio::test]
async fn test_create_order_without_line_items() {
    let t = setup().await;
    let mut body = order_request();
    body["line_items"] = json!([]);

    let (status, json) = t.post("/orders", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_create_order_with_zero_quantity() {
    let t = setup().await;
    let mut body = order_request();
    body["line_items"][0]["quantity"] = json!(0);

    let (status, json) = t.post("/orders", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_get_missing_order() {
    let t = setup().await;
    let (status, json) = t
        .get(&format!("/orders/{}", common::OrderId::new()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["type"], "not_found");
    assert_eq!(json["error"]["code"], "order_not_found");
}

#[tokio::test]
async fn test_invalid_order_id() {
    let t = setup().await;
    let (status, json) = t.get("/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_commit_submit() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t.commit(&order_id, "submit", "user-1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "submitted");
    assert_eq!(json["buyer_total_cents"], 10_000);
    assert_eq!(json["commission_fee_cents"], 1_000);
    assert_eq!(json["transactions"][0]["status"], "succeeded");
    assert_eq!(t.sandbox.payment.charge_count(), 1);
    assert_eq!(t.sandbox.inventory.held("artwork-a"), 1);
}

#[tokio::test]
async fn test_commit_unseeded_artwork_is_gateway_error() {
    let t = setup().await;
    let mut body = order_request();
    body["line_items"][0]["artwork_id"] = json!("artwork-unknown");
    let order_id = t.create_order(body).await;

    let (status, json) = t.commit(&order_id, "submit", "user-1").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["type"], "gateway");
    assert_eq!(t.sandbox.payment.charge_count(), 0);
}

#[tokio::test]
async fn test_seeded_stock_limits_commits() {
    let t = setup().await;
    let (status, _) = t
        .post(
            "/sandbox/fixtures",
            json!({ "stock": [{ "artwork_id": "artwork-a", "available": 0 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t.commit(&order_id, "submit", "user-1").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "insufficient_inventory");
}

#[tokio::test]
async fn test_commit_uncommittable_action() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t.commit(&order_id, "fulfill", "user-1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "validation");
    assert_eq!(json["error"]["code"], "uncommittable_action");
    assert_eq!(json["error"]["data"]["action"], "fulfill");
}

#[tokio::test]
async fn test_commit_wrong_state() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t.commit(&order_id, "approve", "partner-user").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "invalid_state");
    assert_eq!(json["error"]["data"]["state"], "pending");
}

#[tokio::test]
async fn test_commit_declined_charge() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;
    t.sandbox
        .payment
        .decline_with("card_declined", "Your card was declined.");

    let (status, json) = t.commit(&order_id, "submit", "user-1").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["type"], "processing");
    assert_eq!(json["error"]["code"], "charge_authorization_failed");
    assert_eq!(json["error"]["data"]["failure_code"], "card_declined");
    assert_eq!(t.notifier.notices().len(), 1);

    let (_, stored) = t.get(&format!("/orders/{order_id}")).await;
    assert_eq!(stored["state"], "pending");
    assert_eq!(stored["transactions"][0]["status"], "failed");
}

#[tokio::test]
async fn test_expire_stale_and_expired() {
    let settings = CommitSettings {
        expirations: StateExpirations {
            pending: Duration::zero(),
            ..StateExpirations::default()
        },
        ..CommitSettings::default()
    };
    let t = setup_with(settings).await;
    let order_id = t.create_order(order_request()).await;
    let uri = format!("/orders/{order_id}/expire");

    let (status, json) = t.post(&uri, json!({ "expected_state": "submitted" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "stale");
    assert!(json["order"].is_null());

    let (status, json) = t.post(&uri, json!({ "expected_state": "pending" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "expired");
    assert_eq!(json["order"]["state"], "canceled");
    assert_eq!(json["order"]["state_reason"], "expired_unconfirmed");
}

#[tokio::test]
async fn test_pending_order_is_not_expired_early() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t
        .post(
            &format!("/orders/{order_id}/expire"),
            json!({ "expected_state": "pending" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "stale");
}

#[tokio::test]
async fn test_lifecycle_endpoints() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;
    let base = format!("/orders/{order_id}");

    let (status, _) = t.commit(&order_id, "submit", "user-1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.commit(&order_id, "approve", "partner-user").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = t
        .post(&format!("{base}/fulfill"), json!({ "actor": "partner-user" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "fulfilled");

    let (status, json) = t
        .post(&format!("{base}/abandon"), json!({ "actor": "user-1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "invalid_state");

    let (status, json) = t
        .post(&format!("{base}/refund"), json!({ "actor": "admin" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "refunded");
    assert_eq!(t.sandbox.payment.refunds().len(), 1);
    assert_eq!(t.sandbox.inventory.undeduct_calls(), vec!["artwork-a"]);
}

/// Creates an offer-mode order, places a buyer offer and submits it.
async fn submitted_offer_order(t: &TestApp) -> (String, String) {
    let mut body = order_request();
    body["mode"] = json!("offer");
    let order_id = t.create_order(body).await;

    let (status, offer) = t
        .post(
            &format!("/sandbox/orders/{order_id}/offers"),
            json!({ "from_participant": "buyer", "amount_cents": 9_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(offer["order_id"], order_id.as_str());

    let (status, json) = t.commit(&order_id, "submit", "user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items_total_cents"], 9_000);

    (order_id, offer["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_offer_on_buy_now_order() {
    let t = setup().await;
    let order_id = t.create_order(order_request()).await;

    let (status, json) = t
        .post(
            &format!("/sandbox/orders/{order_id}/offers"),
            json!({ "from_participant": "buyer", "amount_cents": 9_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_accept_offer() {
    let t = setup().await;
    let (order_id, offer_id) = submitted_offer_order(&t).await;

    let (status, json) = t
        .post(
            &format!("/offers/{offer_id}/accept"),
            json!({ "responder": "seller", "user_id": "partner-user" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], order_id.as_str());
    assert_eq!(json["state"], "approved");
    assert_eq!(json["items_total_cents"], 9_000);
}

#[tokio::test]
async fn test_accept_own_offer() {
    let t = setup().await;
    let (_, offer_id) = submitted_offer_order(&t).await;

    let (status, json) = t
        .post(
            &format!("/offers/{offer_id}/accept"),
            json!({ "responder": "buyer", "user_id": "user-1" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "cannot_accept_offer");
}

#[tokio::test]
async fn test_reject_offer() {
    let t = setup().await;
    let (_, offer_id) = submitted_offer_order(&t).await;

    let (status, json) = t
        .post(
            &format!("/offers/{offer_id}/reject"),
            json!({
                "responder": "seller",
                "reason": "seller_rejected_offer_too_low",
                "user_id": "partner-user",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "canceled");
    assert_eq!(json["state_reason"], "seller_rejected_offer_too_low");
    assert_eq!(t.sandbox.payment.refunds().len(), 1);
}

#[tokio::test]
async fn test_unknown_offer() {
    let t = setup().await;
    let (status, json) = t
        .post(
            &format!("/offers/{}/accept", common::OfferId::new()),
            json!({ "responder": "seller", "user_id": "partner-user" }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "offer_not_found");
}

#[tokio::test]
async fn test_sandbox_routes_are_optional() {
    let (state, _) = api::create_default_state(
        InMemoryOrderStore::new(),
        CommitSettings::default(),
        Arc::new(InMemoryNotifier::new()),
    );
    let app = api::create_app(state, None, get_metrics_handle());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sandbox/fixtures")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
