mod common;

use common::TestApp;
use serde_json::{json, Value};
use warp::http::StatusCode;

fn order(lines: &[(&String, i32)]) -> Value {
    json!({
        "phoneNumber": "01711000000",
        "address": "12 Lake Road, Dhaka",
        "items": lines
            .iter()
            .map(|(id, quantity)| json!({ "productId": id, "quantity": quantity }))
            .collect::<Vec<_>>(),
        "paymentMethod": "Cash on Delivery",
        "orderStatus": "Pending"
    })
}

async fn stock_of(app: &TestApp, product: &str) -> i64 {
    let (_, body) = app
        .call("GET", &format!("/api/products/single-product/{product}"), None, None)
        .await;
    body["data"]["quantityInStock"].as_i64().unwrap()
}

#[tokio::test]
async fn stock_is_never_oversold() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let customer = app.sign_up("Buyer", "buyer@example.com").await;
    let rice = app.create_product(&admin, "Miniket Rice", "Grains", 10., 5).await;

    let (status, body) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(order(&[(&rice, 3)])))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["subtotal"], 30.);
    assert_eq!(body["data"]["deliveryCharge"], 60.);
    assert_eq!(body["data"]["totalAmount"], 90.);
    assert_eq!(body["data"]["orderStatus"], "Pending");
    assert_eq!(stock_of(&app, &rice).await, 2);

    let (status, body) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(order(&[(&rice, 3)])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient stock for product Miniket Rice");
    assert_eq!(stock_of(&app, &rice).await, 2);

    let (_, body) = app
        .call("GET", "/api/orders/user-orders", Some(&customer), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn a_failing_line_cancels_the_whole_order() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let customer = app.sign_up("Buyer", "buyer@example.com").await;
    let lentils = app.create_product(&admin, "Masoor Dal", "Grains", 5., 10).await;
    let ghee = app.create_product(&admin, "Ghee", "Dairy", 20., 1).await;

    let (status, _) = app
        .call(
            "POST",
            "/api/orders/create-order",
            Some(&customer),
            Some(order(&[(&lentils, 4), (&ghee, 2)])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, &lentils).await, 10);
    assert_eq!(stock_of(&app, &ghee).await, 1);

    let missing = uuid::Uuid::new_v4().to_string();
    let (status, _) = app
        .call(
            "POST",
            "/api/orders/create-order",
            Some(&customer),
            Some(order(&[(&lentils, 1), (&missing, 1)])),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stock_of(&app, &lentils).await, 10);
}

#[tokio::test]
async fn orders_keep_the_price_they_were_placed_at() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let customer = app.sign_up("Buyer", "buyer@example.com").await;
    let oil = app.create_product(&admin, "Mustard Oil", "Oils", 12.5, 10).await;

    let mut body = order(&[(&oil, 2)]);
    body["totalAmount"] = json!(1.);
    let (status, _) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .call(
            "PUT",
            &format!("/api/products/update-product/{oil}"),
            Some(&admin),
            Some(json!({
                "name": "Mustard Oil",
                "price": 99.,
                "category": "Oils",
                "unit": "litre"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .call("GET", "/api/orders/user-orders", Some(&customer), None)
        .await;
    let placed = &body["data"][0];
    assert_eq!(placed["items"][0]["currentUnitPrice"], 12.5);
    assert_eq!(placed["items"][0]["product"]["price"], 99.);
    assert_eq!(placed["subtotal"], 25.);
    assert_eq!(placed["totalAmount"], 85.);
}

#[tokio::test]
async fn status_follows_the_lifecycle() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let customer = app.sign_up("Buyer", "buyer@example.com").await;
    let salt = app.create_product(&admin, "Salt", "Spices", 1., 100).await;
    let (_, body) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(order(&[(&salt, 1)])))
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let update = |status: &str| json!({ "orderId": id, "status": status });

    let (status, _) = app
        .call("PATCH", "/api/orders/update-order", Some(&customer), Some(update("Confirmed")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call("PATCH", "/api/orders/update-order", Some(&admin), Some(update("Shipped")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order cannot move from Pending to Shipped");

    for next in ["Confirmed", "Shipped", "Delivered"] {
        let (status, body) = app
            .call("PATCH", "/api/orders/update-order", Some(&admin), Some(update(next)))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["orderStatus"], next);
    }

    let (status, _) = app
        .call("PATCH", "/api/orders/update-order", Some(&admin), Some(update("Cancelled")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_listings_are_scoped_by_role() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let first = app.sign_up("First", "first@example.com").await;
    let second = app.sign_up("Second", "second@example.com").await;
    let flour = app.create_product(&admin, "Atta", "Grains", 3., 50).await;
    for token in [&first, &second] {
        let body = order(&[(&flour, 1)]);
        app.call("POST", "/api/orders/create-order", Some(token.as_str()), Some(body))
            .await;
    }

    let (_, own) = app
        .call("GET", "/api/orders/user-orders", Some(&first), None)
        .await;
    assert_eq!(own["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call("GET", "/api/orders/all-orders", Some(&first), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, all) = app
        .call("GET", "/api/orders/all-orders", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let all = all["data"].as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["user"]["fullName"], "Second");
}

#[tokio::test]
async fn empty_carts_and_other_payments_are_refused() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let customer = app.sign_up("Buyer", "buyer@example.com").await;
    let tea = app.create_product(&admin, "Tea", "Drinks", 4., 5).await;

    let (status, body) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(order(&[])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Your cart is empty");

    let mut card = order(&[(&tea, 1)]);
    card["paymentMethod"] = json!("Card");
    let (status, _) = app
        .call("POST", "/api/orders/create-order", Some(&customer), Some(card))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, &tea).await, 5);
}
