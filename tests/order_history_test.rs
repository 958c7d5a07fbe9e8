//! Order history reads: listing order, summaries, and user scoping.

mod common;

use axum::http::StatusCode;
use common::{response_json, shipping_address, TestApp};
use serde_json::json;

async fn place_order(app: &TestApp, token: &str, product_id: uuid::Uuid, quantity: i32) -> String {
    app.post(
        "/api/v1/cart/items",
        Some(token),
        json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;
    let body = response_json(
        app.post(
            "/api/v1/orders",
            Some(token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await,
    )
    .await;
    body["data"]["id"].as_str().unwrap().to_string()
}

// ==================== Listing Tests ====================

#[tokio::test]
async fn orders_list_newest_first_with_summaries() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let mug = app.seed_product("Mug", 5000, 10).await;
    let token = app.token_for("user_1");

    let first = place_order(&app, &token, pen, 2).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = place_order(&app, &token, mug, 1).await;

    let response = app.get("/api/v1/orders", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let orders = body["data"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], second.as_str());
    assert_eq!(orders[1]["id"], first.as_str());
    assert_eq!(orders[0]["total_amount"], 5000);
    assert_eq!(orders[0]["item_count"], 1);
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn listing_only_shows_the_callers_orders() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token_a = app.token_for("user_a");
    let token_b = app.token_for("user_b");

    place_order(&app, &token_a, pen, 1).await;

    let body = response_json(app.get("/api/v1/orders", Some(&token_b)).await).await;
    assert!(body["data"]["orders"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["total"], 0);
}

// ==================== Detail Tests ====================

#[tokio::test]
async fn order_detail_includes_snapshot_items() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    let order_id = place_order(&app, &token, pen, 3).await;

    let body = response_json(
        app.get(&format!("/api/v1/orders/{order_id}"), Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["data"]["total_amount"], 3000);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Pen");
}

#[tokio::test]
async fn another_users_order_detail_is_404() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token_a = app.token_for("user_a");
    let token_b = app.token_for("user_b");
    let order_id = place_order(&app, &token_a, pen, 1).await;

    let response = app
        .get(&format!("/api/v1/orders/{order_id}"), Some(&token_b))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_order_is_404() {
    let app = TestApp::new().await;
    let token = app.token_for("user_1");

    let response = app
        .get(
            "/api/v1/orders/00000000-0000-0000-0000-000000000000",
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
