//! End-to-end API tests: the full router driven in-process over an
//! in-memory database, exercising the shop's day as a client would.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use till_db::{Database, DbConfig};
use till_server::media::MediaStore;
use till_server::routes;
use till_server::state::{load_onboarding, AppState};

/// Builds the full app over a fresh in-memory database. The TempDir must
/// outlive the test; dropping it deletes the media directory.
async fn test_app() -> (tempfile::TempDir, Router) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let onboarding = load_onboarding(&db).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let media = MediaStore::init(dir.path()).await.unwrap();
    let state = Arc::new(AppState::new(db, onboarding, media));
    (dir, routes::router(state))
}

/// Sends one JSON request and decodes the JSON response (Null when empty).
async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

/// Walks the whole onboarding flow with one branch on the standard plan.
async fn onboard(app: &Router) {
    let (status, _) = post(
        app,
        "/api/onboarding/business",
        json!({"name": "Corner Mart", "ownerName": "Dana Khan", "phone": "+1-555-0100"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        app,
        "/api/onboarding/branches",
        json!([{"name": "Main Street"}]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(app, "/api/onboarding/subscription", json!({"plan": "standard"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        app,
        "/api/onboarding/employees",
        json!([{"name": "Rafi", "role": "cashier", "branchIndex": 0}]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], json!(true));
}

/// Creates a catalog item and returns its body.
async fn create_item(app: &Router, sku: &str, price_cents: i64, quantity: i64) -> Value {
    let (status, body) = post(
        app,
        "/api/items",
        json!({"sku": sku, "name": format!("Item {sku}"), "priceCents": price_cents, "quantity": quantity}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_database_and_registers() {
    let (_dir, app) = test_app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["database"], json!(true));
    assert_eq!(body["openRegisters"], json!(0));
}

// =============================================================================
// Onboarding
// =============================================================================

#[tokio::test]
async fn test_onboarding_full_flow() {
    let (_dir, app) = test_app().await;

    let (status, body) = get(&app, "/api/onboarding").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], json!("business_info"));
    assert_eq!(body["complete"], json!(false));

    onboard(&app).await;

    let (_, body) = get(&app, "/api/onboarding").await;
    assert_eq!(body["step"], json!("complete"));
    assert_eq!(body["business"]["name"], json!("Corner Mart"));
    assert_eq!(body["branches"][0]["name"], json!("Main Street"));
    assert_eq!(body["plan"], json!("standard"));
    assert_eq!(body["employees"][0]["role"], json!("cashier"));

    // Onboarding created the subscription.
    let (status, body) = get(&app, "/api/subscription").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], json!("standard"));
    assert_eq!(body["status"], json!("active"));
    assert_eq!(body["maxBranches"], json!(3));
}

#[tokio::test]
async fn test_onboarding_enforces_step_order() {
    let (_dir, app) = test_app().await;

    let (status, body) = post(
        &app,
        "/api/onboarding/branches",
        json!([{"name": "Main Street"}]),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("ONBOARDING_ERROR"));
}

#[tokio::test]
async fn test_onboarding_plan_must_cover_branches() {
    let (_dir, app) = test_app().await;

    post(
        &app,
        "/api/onboarding/business",
        json!({"name": "Corner Mart", "ownerName": "Dana", "phone": "+1-555-0100"}),
    )
    .await;
    post(
        &app,
        "/api/onboarding/branches",
        json!([{"name": "One"}, {"name": "Two"}]),
    )
    .await;

    // Basic covers a single branch.
    let (status, body) = post(&app, "/api/onboarding/subscription", json!({"plan": "basic"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("ONBOARDING_ERROR"));

    let (status, _) = post(&app, "/api/onboarding/subscription", json!({"plan": "standard"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_onboarding_employee_branch_index_must_exist() {
    let (_dir, app) = test_app().await;

    post(
        &app,
        "/api/onboarding/business",
        json!({"name": "Corner Mart", "ownerName": "Dana", "phone": "+1-555-0100"}),
    )
    .await;
    post(&app, "/api/onboarding/branches", json!([{"name": "Main"}])).await;
    post(&app, "/api/onboarding/subscription", json!({"plan": "standard"})).await;

    // Only branch index 0 exists.
    let (status, body) = post(
        &app,
        "/api/onboarding/employees",
        json!([{"name": "Rafi", "role": "cashier", "branchIndex": 5}]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));

    // The flow stays on the employees step and accepts a valid index.
    let (status, body) = post(
        &app,
        "/api/onboarding/employees",
        json!([{"name": "Rafi", "role": "cashier", "branchIndex": 0}]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], json!(true));
}

#[tokio::test]
async fn test_onboarding_rejects_steps_after_completion() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;

    let (status, body) = post(
        &app,
        "/api/onboarding/business",
        json!({"name": "Second Mart", "ownerName": "Dana", "phone": "+1-555-0100"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("ONBOARDING_ERROR"));
    assert_eq!(body["message"], json!("Business is already onboarded"));
}

#[tokio::test]
async fn test_onboarding_back_returns_to_previous_step() {
    let (_dir, app) = test_app().await;

    post(
        &app,
        "/api/onboarding/business",
        json!({"name": "Corner Mart", "ownerName": "Dana", "phone": "+1-555-0100"}),
    )
    .await;
    post(&app, "/api/onboarding/branches", json!([{"name": "Main"}])).await;

    let (status, body) = post(&app, "/api/onboarding/back", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], json!("branches"));
    // Collected data survives going back.
    assert_eq!(body["business"]["name"], json!("Corner Mart"));
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_item_crud_and_search() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;

    create_item(&app, "COLA-330", 150, 24).await;
    create_item(&app, "CHIPS-50", 250, 10).await;

    // Duplicate SKU is rejected.
    let (status, body) = post(
        &app,
        "/api/items",
        json!({"sku": "COLA-330", "name": "Again", "priceCents": 100}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));

    let (_, body) = get(&app, "/api/items").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = get(&app, "/api/items?query=cola").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["sku"], json!("COLA-330"));

    // Reprice.
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/items/COLA-330",
        Some(json!({"priceCents": 175})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priceCents"], json!(175));

    // Soft delete hides the item from default listings.
    let (status, _) = send(&app, Method::DELETE, "/api/items/CHIPS-50", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/api/items").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/api/items?include_inactive=true").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stock_adjustment_cannot_go_negative() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    let (status, body) = post(&app, "/api/items/COLA-330/stock", json!({"delta": -3})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], json!(2));

    let (status, body) = post(&app, "/api/items/COLA-330/stock", json!({"delta": -3})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("OUT_OF_STOCK"));

    let (status, _) = post(&app, "/api/items/COLA-330/stock", json!({"delta": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Registers, carts and checkout
// =============================================================================

#[tokio::test]
async fn test_cart_requires_open_session() {
    let (_dir, app) = test_app().await;

    let (status, body) = get(&app, "/api/registers/lane-1/cart").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn test_sale_flow_checkout_decrements_stock() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 10).await;
    create_item(&app, "CHIPS-50", 250, 4).await;

    let (status, body) = post(&app, "/api/registers/lane-1/session", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["catalogSize"], json!(2));

    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;
    send(
        &app,
        Method::PUT,
        "/api/registers/lane-1/cart/items/COLA-330",
        Some(json!({"quantity": 3})),
    )
    .await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "CHIPS-50"})).await;

    let (_, cart) = get(&app, "/api/registers/lane-1/cart").await;
    assert_eq!(cart["units"], json!(4));
    assert_eq!(cart["totalCents"], json!(700));

    // Customer hands over the exact total.
    let (status, cart) = post(
        &app,
        "/api/registers/lane-1/cart/payment",
        json!({"amountCents": 700}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["remainingDueCents"], json!(0));

    let (status, invoice) = post(&app, "/api/registers/lane-1/checkout", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(invoice["invoiceNumber"]
        .as_str()
        .unwrap()
        .starts_with("INV-"));
    assert_eq!(invoice["status"], json!("paid"));
    assert_eq!(invoice["totalCents"], json!(700));

    // Stock moved and the cart is empty but the session survives.
    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(7));

    let (status, cart) = get(&app, "/api/registers/lane-1/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["units"], json!(0));

    // The invoice shows up with its lines.
    let id = invoice["id"].as_str().unwrap();
    let (_, detail) = get(&app, &format!("/api/invoices/{id}")).await;
    assert_eq!(detail["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cart_respects_snapshot_stock() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 2).await;

    post(&app, "/api/registers/lane-1/session", json!({})).await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;

    let (status, body) = post(
        &app,
        "/api/registers/lane-1/cart/items",
        json!({"sku": "COLA-330"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("OUT_OF_STOCK"));

    // Removing the line gives the shadow stock back.
    send(
        &app,
        Method::DELETE,
        "/api/registers/lane-1/cart/items/COLA-330",
        None,
    )
    .await;
    let (status, _) = post(
        &app,
        "/api/registers/lane-1/cart/items",
        json!({"sku": "COLA-330"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_fails_whole_when_live_stock_is_short() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    post(&app, "/api/registers/lane-1/session", json!({})).await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;
    send(
        &app,
        Method::PUT,
        "/api/registers/lane-1/cart/items/COLA-330",
        Some(json!({"quantity": 4})),
    )
    .await;

    // Stock drains behind the open session's back.
    post(&app, "/api/items/COLA-330/stock", json!({"delta": -3})).await;

    let (status, body) = post(&app, "/api/registers/lane-1/checkout", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("OUT_OF_STOCK"));

    // Nothing committed.
    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(2));
    let (_, invoices) = get(&app, "/api/invoices").await;
    assert_eq!(invoices.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_empty_cart_is_rejected() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;

    post(&app, "/api/registers/lane-1/session", json!({})).await;
    let (status, body) = post(&app, "/api/registers/lane-1/checkout", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("CART_ERROR"));
}

#[tokio::test]
async fn test_close_session_abandons_cart() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    post(&app, "/api/registers/lane-1/session", json!({})).await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;

    let (status, _) = send(&app, Method::DELETE, "/api/registers/lane-1/session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, "/api/registers/lane-1/cart").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An abandoned cart never touched real stock.
    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(5));
}

// =============================================================================
// Invoice payments
// =============================================================================

#[tokio::test]
async fn test_invoice_payments_accumulate_to_paid() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 10).await;

    post(&app, "/api/registers/lane-1/session", json!({})).await;
    post(&app, "/api/registers/lane-1/cart/items", json!({"sku": "COLA-330"})).await;
    send(
        &app,
        Method::PUT,
        "/api/registers/lane-1/cart/items/COLA-330",
        Some(json!({"quantity": 4})),
    )
    .await;
    let (_, invoice) = post(&app, "/api/registers/lane-1/checkout", json!({})).await;
    assert_eq!(invoice["status"], json!("unpaid"));
    let id = invoice["id"].as_str().unwrap().to_string();

    let (_, invoices) = get(&app, "/api/invoices?status=unpaid").await;
    assert_eq!(invoices.as_array().unwrap().len(), 1);

    let (status, body) = post(
        &app,
        &format!("/api/invoices/{id}/payments"),
        json!({"amountCents": 200}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("partial"));
    assert_eq!(body["remainingDueCents"], json!(400));

    // Overpaying the remainder is rejected.
    let (status, body) = post(
        &app,
        &format!("/api/invoices/{id}/payments"),
        json!({"amountCents": 500}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("PAYMENT_ERROR"));

    let (status, body) = post(
        &app,
        &format!("/api/invoices/{id}/payments"),
        json!({"amountCents": 400}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("paid"));
    assert_eq!(body["remainingDueCents"], json!(0));
}

// =============================================================================
// Supplier bills
// =============================================================================

#[tokio::test]
async fn test_supplier_bill_receive_is_one_shot() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    let (status, bill) = post(
        &app,
        "/api/supplier-invoices",
        json!({
            "supplierName": "Acme Wholesale",
            "reference": "ACME-7701",
            "lines": [{"sku": "COLA-330", "quantity": 24, "unitCostCents": 90}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(bill["billNumber"].as_str().unwrap().starts_with("BILL-"));
    assert_eq!(bill["totalCents"], json!(2160));
    assert_eq!(bill["status"], json!("unpaid"));
    assert_eq!(bill["stockReceived"], json!(false));
    let id = bill["id"].as_str().unwrap().to_string();

    // Stock untouched until received.
    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(5));

    let (status, body) = post(&app, &format!("/api/supplier-invoices/{id}/receive"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stockReceived"], json!(true));

    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(29));

    // Second receive is rejected and changes nothing.
    let (status, _) = post(&app, &format!("/api/supplier-invoices/{id}/receive"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, item) = get(&app, "/api/items/COLA-330").await;
    assert_eq!(item["quantity"], json!(29));
}

#[tokio::test]
async fn test_supplier_bill_receive_immediately_and_payment() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "CHIPS-50", 250, 0).await;

    let (status, bill) = post(
        &app,
        "/api/supplier-invoices",
        json!({
            "supplierName": "Acme Wholesale",
            "lines": [{"sku": "CHIPS-50", "quantity": 12, "unitCostCents": 200}],
            "amountPaidCents": 1000,
            "receiveImmediately": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["stockReceived"], json!(true));
    assert_eq!(bill["status"], json!("partial"));
    assert_eq!(bill["remainingDueCents"], json!(1400));
    let id = bill["id"].as_str().unwrap().to_string();

    let (_, item) = get(&app, "/api/items/CHIPS-50").await;
    assert_eq!(item["quantity"], json!(12));

    // Settle the rest.
    let (status, body) = post(
        &app,
        &format!("/api/supplier-invoices/{id}/payments"),
        json!({"amountCents": 1400}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("paid"));

    let (_, bills) = get(&app, "/api/supplier-invoices?status=paid").await;
    assert_eq!(bills.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_supplier_bill_rejects_unknown_sku() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;

    let (status, body) = post(
        &app,
        "/api/supplier-invoices",
        json!({
            "supplierName": "Acme Wholesale",
            "lines": [{"sku": "NOPE", "quantity": 1, "unitCostCents": 100}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

// =============================================================================
// Subscription
// =============================================================================

#[tokio::test]
async fn test_subscription_renewal_extends_term() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;

    let (_, before) = get(&app, "/api/subscription").await;
    let before_days = before["daysRemaining"].as_i64().unwrap();

    let (status, after) = post(&app, "/api/subscription/renew", json!({"months": 2})).await;
    assert_eq!(status, StatusCode::OK);
    let after_days = after["daysRemaining"].as_i64().unwrap();
    assert!(after_days > before_days + 30, "{after_days} vs {before_days}");

    // 25 months in one go is past the cap.
    let (status, _) = post(&app, "/api/subscription/renew", json!({"months": 25})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_downgrade_checks_branch_count() {
    let (_dir, app) = test_app().await;

    post(
        &app,
        "/api/onboarding/business",
        json!({"name": "Corner Mart", "ownerName": "Dana", "phone": "+1-555-0100"}),
    )
    .await;
    post(
        &app,
        "/api/onboarding/branches",
        json!([{"name": "One"}, {"name": "Two"}]),
    )
    .await;
    post(&app, "/api/onboarding/subscription", json!({"plan": "standard"})).await;
    post(&app, "/api/onboarding/employees", json!([])).await;

    // Two branches do not fit on basic.
    let (status, body) = post(
        &app,
        "/api/subscription/renew",
        json!({"months": 1, "plan": "basic"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("ONBOARDING_ERROR"));

    // Premium always fits.
    let (status, body) = post(
        &app,
        "/api/subscription/renew",
        json!({"months": 1, "plan": "premium"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], json!("premium"));
}

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_item_image_upload_and_serve() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/items/COLA-330/image")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(&b"png-bytes"[..]))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let item: Value = serde_json::from_slice(&bytes).unwrap();
    let url = item["imageUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/"));
    assert!(url.ends_with(".png"));

    let response = app
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"png-bytes");
}

#[tokio::test]
async fn test_media_rejects_traversal_and_unknown_type() {
    let (_dir, app) = test_app().await;
    onboard(&app).await;
    create_item(&app, "COLA-330", 150, 5).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/items/COLA-330/image")
        .header(header::CONTENT_TYPE, "image/gif")
        .body(Body::from(&b"gif"[..]))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/media/..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
