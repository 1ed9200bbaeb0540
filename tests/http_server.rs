//! Transport-level tests: the axum app in front of the wire router,
//! exercised with in-process requests.

mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::FakeEngine;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use ghostwire::config::Config;
use ghostwire::handlers::AppContext;
use ghostwire::server::{self, ServerState};

fn app() -> axum::Router {
    let state = ServerState {
        ctx: Arc::new(AppContext::new(
            Config::default(),
            Arc::new(FakeEngine::new()),
        )),
        router: Arc::new(server::build_router()),
    };
    server::build_app(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn status_over_http() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], json!(0));
    assert_eq!(json["sessionId"], json!(null));
    assert!(json["value"]["build"]["version"].as_str().is_some());
}

#[tokio::test]
async fn unknown_command_is_http_404_with_envelope() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/no/such/thing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["status"], json!(9));
    assert_eq!(json["value"]["class"], json!("unknown command"));
}

#[tokio::test]
async fn wrong_method_is_http_405() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"desiredCapabilities": {}}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let session_id = json["sessionId"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());
    assert_eq!(json["value"]["browserName"], json!("fake"));

    // Command failure rides HTTP 200 with a body status.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/session/wrong-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], json!(6));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/session/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], json!(0));
    assert_eq!(json["value"], json!(null));
}

#[tokio::test]
async fn malformed_body_is_invalid_argument_envelope() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session")
                .header("content-type", "application/json")
                .body(Body::from("{broken"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], json!(61));
    assert_eq!(json["value"]["class"], json!("invalid argument"));
}
