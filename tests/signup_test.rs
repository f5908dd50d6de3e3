//! Integration tests for POST /sign-up.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn signup_stages_registration_and_dispatches_code() {
    let app = TestApp::spawn();

    let (status, body) = app.sign_up("a@x.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["email"], json!("a@x.com"));
    assert_eq!(body["expiresIn"], json!(3));

    let code = app.dispatched_code("a@x.com");
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn signup_does_not_create_a_durable_user() {
    let app = TestApp::spawn();
    app.sign_up("a@x.com").await;

    use registration_service::services::UserStore;
    assert!(app.users.find_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn second_signup_within_window_is_rejected() {
    let app = TestApp::spawn();

    let (first, _) = app.sign_up("b@x.com").await;
    assert_eq!(first, StatusCode::OK);
    let first_code = app.dispatched_code("b@x.com");

    let (second, body) = app.sign_up("b@x.com").await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("already in progress"));

    // The winner's code was not silently overwritten
    assert_eq!(app.dispatched_code("b@x.com"), first_code);
}

#[tokio::test]
async fn signup_for_registered_email_is_rejected() {
    let app = TestApp::spawn();

    app.sign_up("a@x.com").await;
    let code = app.dispatched_code("a@x.com");
    let (status, _) = app.verify("a@x.com", &code).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Email already registered"));
}

#[tokio::test]
async fn expired_pending_entry_frees_the_email() {
    let app = TestApp::with_otp(chrono::Duration::milliseconds(40), 5);

    app.sign_up("a@x.com").await;
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;

    let (status, body) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn invalid_email_fails_validation() {
    let app = TestApp::spawn();

    let (status, body) = app
        .post(
            "/sign-up",
            json!({
                "email": "not-an-email",
                "password": "secret-password-1",
                "name": "Alice",
                "contact_number": "555-0100",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn short_password_fails_validation() {
    let app = TestApp::spawn();

    let (status, _) = app
        .post(
            "/sign-up",
            json!({
                "email": "a@x.com",
                "password": "short",
                "name": "Alice",
                "contact_number": "555-0100",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing was staged for the rejected request
    let (status, _) = app.resend("a@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_email_dispatch_aborts_staging() {
    let app = TestApp::spawn();
    app.mailer.set_failing(true);

    let (status, body) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));

    // The email is immediately available for another attempt
    app.mailer.set_failing(false);
    let (status, _) = app.sign_up("a@x.com").await;
    assert_eq!(status, StatusCode::OK);
}
