//! Login, registration, and logout handling. Form failures are checked
//! without a database; the `#[ignore]`d tests use real accounts.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use corner_shop_core::Email;
use corner_shop_integration_tests::{
    TEST_PASSWORD, TestClient, body_text, create_user, location, test_pool, unique,
};
use corner_shop_storefront::db::UserRepository;

#[tokio::test]
async fn test_malformed_login_is_generic_failure() {
    let mut client = TestClient::new();

    let response = client
        .post_form("/login", "email=not-an-email&password=whatever&remember=on")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Login Unsuccessful. Please check email and password."));
    assert!(body.contains(r#"value="not-an-email""#));
    assert!(body.contains("checked"));

    // Still anonymous
    let response = client.get("/checkout").await;
    assert_eq!(location(&response), "/login?next=%2Fcheckout");
}

#[tokio::test]
async fn test_registration_reports_each_field() {
    let mut client = TestClient::new();

    let response = client
        .post_form(
            "/register",
            "username=a&email=bad&password=x&confirm_password=y",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Username must be between 2 and 150 characters."));
    assert!(body.contains("Invalid email address."));
    assert!(body.contains("Password must be at least 6 characters."));
    assert!(body.contains("Passwords must match."));
}

#[tokio::test]
async fn test_logged_in_user_skips_auth_pages() {
    let mut client = TestClient::new();
    client.login_as(5, false).await;

    for path in ["/login", "/register"] {
        let response = client.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/", "{path}");
    }

    let response = client
        .post_form("/login", "email=user5%40example.com&password=irrelevant")
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_ends_login_and_is_idempotent() {
    let mut client = TestClient::new();
    client.login_as(5, false).await;

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("user5"));
    assert!(body.contains("Logout"));

    for _ in 0..2 {
        let response = client.get("/logout").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(client.get("/cart").await).await;
    assert!(!body.contains("user5"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_registration_then_login_round_trip() {
    let pool = test_pool().await;
    let mut client = TestClient::with_pool(pool.clone());
    let username = unique("shopper");
    let email = format!("{username}@example.com");

    let response = client
        .post_form(
            "/register",
            &format!(
                "username={username}&email={email}&password={TEST_PASSWORD}&confirm_password={TEST_PASSWORD}"
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let stored = UserRepository::new(&pool)
        .get_by_email(&Email::parse(&email).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_admin);

    let response = client
        .post_form(
            "/login",
            &format!("email={email}&password={TEST_PASSWORD}&next=%2Fcart"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");

    let body = body_text(client.get("/cart").await).await;
    assert!(body.contains("Logged in successfully!"));
    assert!(body.contains(&username));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_duplicate_registration_creates_no_user() {
    let pool = test_pool().await;
    let existing = create_user(&pool, false).await;
    let mut client = TestClient::with_pool(pool.clone());

    let fresh_email = format!("{}@example.com", unique("other"));
    let response = client
        .post_form(
            "/register",
            &format!(
                "username={}&email={fresh_email}&password={TEST_PASSWORD}&confirm_password={TEST_PASSWORD}",
                existing.username.as_str()
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Username already exists. Please choose another."));

    let fresh_name = unique("other");
    let response = client
        .post_form(
            "/register",
            &format!(
                "username={fresh_name}&email={}&password={TEST_PASSWORD}&confirm_password={TEST_PASSWORD}",
                existing.email.as_str()
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Email already registered. Please choose another."));

    let users = UserRepository::new(&pool);
    assert!(
        users
            .get_by_email(&Email::parse(&fresh_email).unwrap())
            .await
            .unwrap()
            .is_none()
    );
    let taken: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shop.app_user WHERE username = $1 OR email = $2")
            .bind(&fresh_name)
            .bind(existing.email.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(taken, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_wrong_password_and_unknown_email_fail_alike() {
    let pool = test_pool().await;
    let user = create_user(&pool, false).await;
    let mut client = TestClient::with_pool(pool);

    let wrong_password = client
        .post_form(
            "/login",
            &format!("email={}&password=not-the-password", user.email.as_str()),
        )
        .await;
    let unknown_email = client
        .post_form(
            "/login",
            &format!("email={}%40example.com&password={TEST_PASSWORD}", unique("nobody")),
        )
        .await;

    for response in [wrong_password, unknown_email] {
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Login Unsuccessful. Please check email and password."));
    }

    let response = client.get("/checkout").await;
    assert_eq!(location(&response), "/login?next=%2Fcheckout");
}
