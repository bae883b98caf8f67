//! Cart and checkout flows. The `#[ignore]`d tests run against a real
//! catalog and check what checkout writes.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use corner_shop_core::Money;
use corner_shop_integration_tests::{
    TestClient, body_text, create_product, create_user, location, login_user, order_count,
    stock_of, test_pool,
};
use corner_shop_storefront::db::ProductRepository;
use corner_shop_storefront::models::Cart;
use corner_shop_storefront::services::{CheckoutError, CheckoutService};

#[tokio::test]
async fn test_empty_cart_page() {
    let mut client = TestClient::new();

    let response = client.get("/cart").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Your cart is empty."));
    assert!(!body.contains("Proceed to Checkout"));
}

#[tokio::test]
async fn test_removing_missing_item_is_a_no_op() {
    let mut client = TestClient::new();

    let response = client.post("/remove_from_cart/42").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");

    let body = body_text(client.get("/cart").await).await;
    assert!(!body.contains("Item removed from cart."));
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let mut client = TestClient::new();

    let response = client.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fcheckout");

    let response = client.post("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fcheckout");
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_home() {
    let mut client = TestClient::new();
    client.login_as(3, false).await;

    let response = client.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("alert-warning"));

    let response = client.post("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_cart_badge_hidden_when_empty() {
    let mut client = TestClient::new();
    let body = body_text(client.get("/cart").await).await;
    assert!(!body.contains(r#"class="badge""#));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_checkout_decrements_stock_by_line_quantity() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let mug = create_product(&pool, "10.00", 5).await;
    let tea = create_product(&pool, "2.50", 3).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    for product in [&mug, &mug, &tea] {
        let response = client.post(&format!("/add_to_cart/{}", product.id)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("$20.00"));
    assert!(body.contains("$22.50"));
    assert!(body.contains(r#"<span class="badge">3</span>"#));

    let response = client.post("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    assert_eq!(stock_of(&pool, &mug).await, 3);
    assert_eq!(stock_of(&pool, &tea).await, 2);
    assert_eq!(order_count(&pool, &customer).await, 1);

    let total: Money =
        sqlx::query_scalar("SELECT total FROM shop.customer_order WHERE user_id = $1")
            .bind(customer.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(total, Money::parse("22.50").unwrap());

    let units: i64 = sqlx::query_scalar(
        r"
        SELECT SUM(l.quantity)::BIGINT
        FROM shop.order_line l
        JOIN shop.customer_order o ON o.id = l.order_id
        WHERE o.user_id = $1
        ",
    )
    .bind(customer.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(units, 3);

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("Order placed successfully!"));
    assert!(body.contains("Your cart is empty."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_out_of_stock_line_writes_nothing() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let in_stock = create_product(&pool, "10.00", 5).await;
    let sold_out = create_product(&pool, "5.00", 0).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    for product in [&in_stock, &in_stock, &sold_out] {
        client.post(&format!("/add_to_cart/{}", product.id)).await;
    }

    let response = client.post("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");

    assert_eq!(stock_of(&pool, &in_stock).await, 5);
    assert_eq!(stock_of(&pool, &sold_out).await, 0);
    assert_eq!(order_count(&pool, &customer).await, 0);

    // The cart is kept for the user to fix
    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("One or more products are out of stock."));
    assert!(body.contains(&in_stock.name));
    assert!(body.contains(&sold_out.name));
    assert!(body.contains(r#"<span class="badge">3</span>"#));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_archived_product_is_dropped_from_cart() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let keep = create_product(&pool, "3.00", 4).await;
    let gone = create_product(&pool, "7.00", 4).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    for product in [&keep, &gone] {
        client.post(&format!("/add_to_cart/{}", product.id)).await;
    }
    ProductRepository::new(&pool).archive(gone.id).await.unwrap();

    let response = client.post("/checkout").await;
    assert_eq!(location(&response), "/cart");
    assert_eq!(order_count(&pool, &customer).await, 0);

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("One or more products are no longer available."));
    assert!(body.contains("were removed from your cart"));
    assert!(body.contains(&keep.name));
    assert!(!body.contains(&gone.name));
    assert!(body.contains(r#"<span class="badge">1</span>"#));

    let response = client.post("/checkout").await;
    assert_eq!(location(&response), "/");
    assert_eq!(order_count(&pool, &customer).await, 1);
    assert_eq!(stock_of(&pool, &keep).await, 3);
    assert_eq!(stock_of(&pool, &gone).await, 4);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_order_total_over_storage_limit_is_refused() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let yacht = create_product(&pool, "999999999.00", 100).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    for _ in 0..11 {
        client.post(&format!("/add_to_cart/{}", yacht.id)).await;
    }

    let response = client.post("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    assert_eq!(order_count(&pool, &customer).await, 0);
    assert_eq!(stock_of(&pool, &yacht).await, 100);

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("Your order total is too large."));
    assert!(body.contains("Over limit"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_concurrent_checkouts_sell_last_unit_once() {
    let pool = test_pool().await;
    let first = create_user(&pool, false).await;
    let second = create_user(&pool, false).await;
    let last_one = create_product(&pool, "15.00", 1).await;

    let mut cart = Cart::default();
    cart.add(last_one.id, 1);

    let service = CheckoutService::new(&pool);
    let (a, b) = tokio::join!(
        service.place_order(first.id, &cart),
        service.place_order(second.id, &cart),
    );

    let placed = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);
    let refused = if a.is_ok() { b } else { a };
    assert!(matches!(
        refused,
        Err(CheckoutError::OutOfStock { available: 0, .. })
    ));

    assert_eq!(stock_of(&pool, &last_one).await, 0);
    assert_eq!(
        order_count(&pool, &first).await + order_count(&pool, &second).await,
        1
    );
}
