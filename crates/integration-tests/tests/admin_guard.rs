//! Admin routes turn away anonymous visitors and customers before any
//! handler work happens, and check the account's current admin flag.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use corner_shop_integration_tests::{
    TestClient, body_text, create_product, create_user, location, login_user, test_pool,
};
use corner_shop_storefront::db::{ProductRepository, UserRepository};

#[tokio::test]
async fn test_anonymous_admin_request_redirects_to_login() {
    let mut client = TestClient::new();

    let response = client.get("/admin/dashboard?orders_page=2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/login?next=%2Fadmin%2Fdashboard%3Forders_page%3D2"
    );

    let login_page = client.get("/login?next=%2Fadmin%2Fdashboard").await;
    assert_eq!(login_page.status(), StatusCode::OK);
    let body = body_text(login_page).await;
    assert!(body.contains("Please log in to access this page."));
    assert!(body.contains(r#"name="next""#));
}

#[tokio::test]
async fn test_anonymous_delete_never_reaches_handler() {
    let mut client = TestClient::new();

    let response = client.post("/admin/delete_product/1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fadmin%2Fdelete_product%2F1");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_customer_delete_is_denied_and_catalog_unchanged() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let product = create_product(&pool, "4.00", 3).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    let response = client
        .post(&format!("/admin/delete_product/{}", product.id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("Access denied."));
    assert!(body.contains("alert-danger"));

    let still_there = ProductRepository::new(&pool)
        .get_active(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_there.stock, 3);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_customer_cannot_open_product_form() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let mut client = TestClient::with_pool(pool);
    login_user(&mut client, &customer).await;

    for path in ["/admin/add_product", "/admin/edit_product/3", "/admin/dashboard"] {
        let response = client.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/", "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_admin_sees_product_form() {
    let pool = test_pool().await;
    let admin = create_user(&pool, true).await;
    let mut client = TestClient::with_pool(pool);
    login_user(&mut client, &admin).await;

    let response = client.get("/admin/add_product").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Add Product"));
    assert!(body.contains(r#"enctype="multipart/form-data""#));
    assert!(body.contains(r#"href="/admin/dashboard">Admin"#));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_invalid_product_form_shows_every_error() {
    let pool = test_pool().await;
    let admin = create_user(&pool, true).await;
    let mut client = TestClient::with_pool(pool);
    login_user(&mut client, &admin).await;

    let response = client
        .post_multipart(
            "/admin/add_product",
            &[
                ("name", "X"),
                ("description", "   "),
                ("price", "cheap"),
                ("stock", "-4"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Name must be between 2 and 150 characters."));
    assert!(body.contains("Description is required."));
    assert!(body.contains("Price amount must be a number."));
    assert!(body.contains("Stock cannot be negative."));
    // Typed values are kept
    assert!(body.contains(r#"value="cheap""#));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_revoked_admin_loses_access_without_logging_out() {
    let pool = test_pool().await;
    let admin = create_user(&pool, true).await;
    let product = create_product(&pool, "9.00", 2).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &admin).await;

    let response = client.get("/admin/add_product").await;
    assert_eq!(response.status(), StatusCode::OK);

    UserRepository::new(&pool)
        .set_admin(&admin.email, false)
        .await
        .unwrap();

    let response = client
        .post(&format!("/admin/delete_product/{}", product.id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(
        ProductRepository::new(&pool)
            .get_active(product.id)
            .await
            .unwrap()
            .is_some()
    );

    // The session's navigation flag follows the account
    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("Access denied."));
    assert!(!body.contains(r#"href="/admin/dashboard">Admin"#));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_promoted_customer_gains_access_without_logging_in_again() {
    let pool = test_pool().await;
    let customer = create_user(&pool, false).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &customer).await;

    UserRepository::new(&pool)
        .set_admin(&customer.email, true)
        .await
        .unwrap();

    let response = client.get("/admin/add_product").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_admin_delete_archives_product() {
    let pool = test_pool().await;
    let admin = create_user(&pool, true).await;
    let product = create_product(&pool, "1.25", 1).await;
    let mut client = TestClient::with_pool(pool.clone());
    login_user(&mut client, &admin).await;

    let response = client
        .post(&format!("/admin/delete_product/{}", product.id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");

    let products = ProductRepository::new(&pool);
    assert!(products.get_active(product.id).await.unwrap().is_none());

    let response = client.get(&format!("/product/{}", product.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
