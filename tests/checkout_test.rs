//! Checkout behavior: totals, snapshots, validation, and the cart clear.

mod common;

use axum::http::StatusCode;
use common::{response_json, shipping_address, TestApp};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde_json::json;
use storefront_api::entities::{product, Product};

async fn fill_cart(app: &TestApp, token: &str, lines: &[(uuid::Uuid, i32)]) {
    for (product_id, quantity) in lines {
        let response = app
            .post(
                "/api/v1/cart/items",
                Some(token),
                json!({ "product_id": product_id, "quantity": quantity }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

// ==================== Total and Snapshot Tests ====================

#[tokio::test]
async fn order_total_sums_current_prices() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let mug = app.seed_product("Mug", 5000, 10).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 2), (mug, 1)]).await;

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["data"]["total_amount"], 7000);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["payment_status"], "pending");
}

#[tokio::test]
async fn order_items_snapshot_name_and_price() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 2)]).await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    // reprice the product after the order exists
    let current = Product::find_by_id(pen)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = current.into();
    active.price = Set(99_999);
    active.name = Set("Deluxe Pen".into());
    active.update(app.db.as_ref()).await.unwrap();

    let body = response_json(
        app.get(&format!("/api/v1/orders/{order_id}"), Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["data"]["total_amount"], 2000);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Pen");
    assert_eq!(items[0]["price"], 1000);
    assert_eq!(items[0]["quantity"], 2);
}

// ==================== Validation Tests ====================

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = TestApp::new().await;
    let token = app.token_for("user_1");

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
}

#[tokio::test]
async fn blank_shipping_fields_are_rejected() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 1)]).await;

    let mut address = shipping_address();
    address["phone"] = json!("   ");
    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": address }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("phone"));

    // the cart is untouched by the failed checkout
    let body = response_json(app.get("/api/v1/cart", Some(&token)).await).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_rejects_quantities_beyond_stock() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 3).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 5)]).await;

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("Pen"));
}

#[tokio::test]
async fn checkout_rejects_deactivated_products() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 1)]).await;

    let current = Product::find_by_id(pen)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = current.into();
    active.is_active = Set(false);
    active.update(app.db.as_ref()).await.unwrap();

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Cart Clear Tests ====================

#[tokio::test]
async fn successful_checkout_clears_the_cart() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 2)]).await;

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address(), "order_note": "ring the bell" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(app.get("/api/v1/cart", Some(&token)).await).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_survives_a_failed_cart_clear() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 2)]).await;

    // make every cart_items delete fail; the clear is best-effort and the
    // order must stand regardless
    app.db
        .execute_unprepared(
            "CREATE TRIGGER block_cart_clear BEFORE DELETE ON cart_items \
             BEGIN SELECT RAISE(ABORT, 'cart clear blocked'); END",
        )
        .await
        .unwrap();

    let response = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    // the order is fully readable
    let body = response_json(
        app.get(&format!("/api/v1/orders/{order_id}"), Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["data"]["total_amount"], 2000);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    // and the stale cart line is still there
    let body = response_json(app.get("/api/v1/cart", Some(&token)).await).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn order_note_is_stored_verbatim() {
    let app = TestApp::new().await;
    let pen = app.seed_product("Pen", 1000, 50).await;
    let token = app.token_for("user_1");
    fill_cart(&app, &token, &[(pen, 1)]).await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            Some(&token),
            json!({ "shipping_address": shipping_address(), "order_note": "leave at the door" }),
        )
        .await,
    )
    .await;
    assert_eq!(body["data"]["order_note"], "leave at the door");
    assert_eq!(body["data"]["shipping_address"]["zip_code"], "04524");
}
