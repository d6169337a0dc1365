//! Download rejections must not reveal whether the email or the password
//! was wrong: 404 and 401 carry identical body wording.

#[path = "../common/mod.rs"]
mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn download_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

async fn error_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    value["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn unknown_email_and_wrong_password_share_wording() {
    let harness = test_harness(FakeVerifier::new());
    {
        let conn = harness.conn();
        create_test_sale(&conn, "T1", "a@b.com");
    }
    let app = app(harness.state.clone());

    let not_found = app
        .clone()
        .oneshot(download_request("nobody@b.com", "AnyPass23456"))
        .await
        .unwrap();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    let not_found_msg = error_text(not_found).await;

    let mismatch = app
        .oneshot(download_request("a@b.com", "WrongPass2345"))
        .await
        .unwrap();
    assert_eq!(mismatch.status(), StatusCode::UNAUTHORIZED);
    let mismatch_msg = error_text(mismatch).await;

    assert_eq!(
        not_found_msg, mismatch_msg,
        "response wording must not distinguish wrong email from wrong secret"
    );
}

#[tokio::test]
async fn wrong_password_never_touches_the_counter() {
    let harness = test_harness(FakeVerifier::new());
    let sale_id = {
        let conn = harness.conn();
        let (sale, _password) = create_test_sale(&conn, "T1", "a@b.com");
        sale.id
    };
    let app = app(harness.state.clone());

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(download_request("a@b.com", "WrongPass2345"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let conn = harness.conn();
    let sale = queries::get_sale_by_reference(&conn, "T1")
        .unwrap()
        .expect("sale");
    assert_eq!(sale.id, sale_id);
    assert_eq!(sale.downloads_used, 0, "rejections must not consume quota");
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() {
    let harness = test_harness(FakeVerifier::new());
    let app = app(harness.state.clone());

    let response = app
        .oneshot(download_request("", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
