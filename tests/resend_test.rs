//! Integration tests for POST /resend-otp.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn resend_dispatches_a_fresh_code() {
    let app = TestApp::spawn();

    app.sign_up("alice@x.com").await;
    let first = app.dispatched_code("alice@x.com");

    let (status, body) = app.resend("alice@x.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["expiresIn"], json!(3));

    let second = app.dispatched_code("alice@x.com");
    // Six random digits collide one in a million; a match here means the
    // code was not regenerated.
    assert_ne!(first, second);
}

#[tokio::test]
async fn old_code_is_dead_after_resend() {
    let app = TestApp::spawn();

    app.sign_up("alice@x.com").await;
    let old = app.dispatched_code("alice@x.com");

    app.resend("alice@x.com").await;
    let new = app.dispatched_code("alice@x.com");

    let (status, body) = app.verify("alice@x.com", &old).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid OTP"));

    let (status, _) = app.verify("alice@x.com", &new).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn resend_without_pending_registration_is_rejected() {
    let app = TestApp::spawn();

    let (status, body) = app.resend("nobody@x.com").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("No pending registration for this email")
    );
}

#[tokio::test]
async fn resend_after_expiry_is_rejected() {
    let app = TestApp::with_otp(chrono::Duration::milliseconds(40), 5);

    app.sign_up("alice@x.com").await;
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;

    let (status, body) = app.resend("alice@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("No pending registration for this email")
    );
}

#[tokio::test]
async fn resend_restarts_the_expiry_window() {
    let app = TestApp::with_otp(chrono::Duration::milliseconds(200), 5);

    app.sign_up("alice@x.com").await;

    // Resend just before expiry, then verify after the original window
    // would have closed.
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    let (status, _) = app.resend("alice@x.com").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    let code = app.dispatched_code("alice@x.com");
    let (status, _) = app.verify("alice@x.com", &code).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn resend_resets_the_attempt_count() {
    let app = TestApp::with_otp(chrono::Duration::minutes(3), 3);

    app.sign_up("alice@x.com").await;
    let code = app.dispatched_code("alice@x.com");
    let wrong = if code == "000000" { "000001" } else { "000000" };

    for _ in 0..2 {
        app.verify("alice@x.com", wrong).await;
    }

    app.resend("alice@x.com").await;

    // Two more wrong guesses fit within the refreshed cap
    for _ in 0..2 {
        let (status, body) = app.verify("alice@x.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Invalid OTP"));
    }

    let fresh = app.dispatched_code("alice@x.com");
    let (status, _) = app.verify("alice@x.com", &fresh).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn failed_dispatch_keeps_the_pending_entry() {
    let app = TestApp::spawn();

    app.sign_up("alice@x.com").await;
    app.mailer.set_failing(true);

    let (status, _) = app.resend("alice@x.com").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The registration survives; a later resend succeeds
    app.mailer.set_failing(false);
    let (status, _) = app.resend("alice@x.com").await;
    assert_eq!(status, StatusCode::OK);
}
