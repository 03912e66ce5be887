//! API integration tests
//!
//! These run against a live server with a fresh database:
//! cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an authenticated admin client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin-password"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_first_registered_user_is_admin() {
    // Requires an empty users table
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "admin",
            "email": "admin@example.org",
            "password": "admin-password",
            "password_confirm": "admin-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["is_admin"], true);

    // The second registered user is a regular member
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "reader",
            "email": "reader@example.org",
            "password": "reader-password",
            "password_confirm": "reader-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
#[ignore]
async fn test_register_duplicate_username_conflicts() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "admin",
            "email": "someone-else@example.org",
            "password": "whatever-password",
            "password_confirm": "whatever-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books_is_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_admin() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Unauthorized",
            "author": "Nobody",
            "isbn": "9780000000000",
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_checkout_return_renew_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    // Create a single-copy book
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Lifecycle Test Book",
            "author": "Test Author",
            "isbn": "9780441172719",
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");
    assert_eq!(body["available_copies"], 1);

    // Check out
    let response = client
        .post(format!("{}/books/{}/checkout", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // A second checkout of the same book by the same user is refused
    let response = client
        .post(format!("{}/books/{}/checkout", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Renew twice, then the third attempt hits the limit
    for _ in 0..2 {
        let response = client
            .post(format!("{}/books/{}/renew", BASE_URL, book_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
    }
    let response = client
        .post(format!("{}/books/{}/renew", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Return, then a second return reports already-returned
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Availability is restored, so the book can be deleted
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], body["total_copies"]);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_delete_book_with_copies_on_loan_is_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Borrowed Book",
            "author": "Test Author",
            "isbn": "9780805209990",
            "total_copies": 2
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");

    let response = client
        .post(format!("{}/books/{}/checkout", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Cleanup: return and delete
    let _ = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_reducing_total_copies_below_on_loan_is_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Retotal Test Book",
            "author": "Test Author",
            "isbn": "9780141439563",
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");

    let response = client
        .post(format!("{}/books/{}/checkout", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // One copy on loan, so the total cannot drop to zero
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Retotal Test Book",
            "author": "Test Author",
            "isbn": "9780141439563",
            "total_copies": 0
        }))
        .send()
        .await
        .expect("Failed to send request");
    // Rejected by the request validator (minimum one copy)
    assert_eq!(response.status(), 400);

    // Cleanup
    let _ = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_delete_user_guards() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    // Admins cannot delete their own account
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let admin_id = body["user"]["id"].as_i64().expect("No user ID");

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, admin_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // A member with no open loans can be deleted
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "shortlived",
            "email": "shortlived@example.org",
            "password": "shortlived-password",
            "password_confirm": "shortlived-password"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let user_id = body["id"].as_i64().expect("No user ID");

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_search_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/search?query=kafka", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_reports_require_admin() {
    let client = Client::new();

    let response = client
        .get(format!("{}/reports", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_reports() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/reports", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    // Empty result sets are fine; the arrays must still be there
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["overdue_loans"].is_array());
    assert!(body["popular_books"].is_array());
    assert!(body["popular_genres"].is_array());
    assert!(body["active_users"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_books"].is_number());
    assert!(body["total_genres"].is_number());
    assert!(body["books_on_loan"].is_number());
}
