// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /, GET /health, GET /diseases
// - POST /chat (single turn, two turns via body id and via header, malformed body)
// - DELETE /chat/{id}
// - static UI under /ui

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use healthbot::dialogue::{CATEGORY_REPROMPT, FALLBACK_REPLY, GREETING_REPLY};
use healthbot::{build_app, AppConfig, InfoField, KnowledgeBase};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, with default config.
fn test_router() -> Router {
    build_app(&AppConfig::default()).expect("build app").0
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

fn chat_request(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /chat")
}

fn care_of(id: &str) -> String {
    KnowledgeBase::embedded()
        .get(id)
        .expect("known id")
        .field(InfoField::Care)
        .to_string()
}

#[tokio::test]
async fn root_and_health() {
    let app = test_router();

    let resp = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await, json!({ "Hello": "World" }));

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "ok");
}

#[tokio::test]
async fn chat_single_turn_returns_reply_and_session() {
    let app = test_router();

    let resp = app
        .oneshot(chat_request(json!({ "message": "hello" })))
        .await
        .expect("oneshot /chat");
    assert_eq!(resp.status(), StatusCode::OK);

    let header_id = resp
        .headers()
        .get("x-session-id")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .expect("x-session-id header");

    let v = read_json(resp).await;
    assert_eq!(v["reply"], GREETING_REPLY);
    assert_eq!(v["session_id"], header_id.as_str());
}

#[tokio::test]
async fn chat_two_turns_with_body_session_id() {
    let app = test_router();

    let r1 = app
        .clone()
        .oneshot(chat_request(json!({ "message": "malaria", "session_id": "abc-1" })))
        .await
        .unwrap();
    let v1 = read_json(r1).await;
    assert_eq!(v1["session_id"], "abc-1");
    assert_eq!(
        v1["reply"],
        "You asked about Malaria. Do you want to know about 'symptoms', 'prevention', or 'care'?"
    );

    // other conversation in between
    let other = app
        .clone()
        .oneshot(chat_request(json!({ "message": "banana", "session_id": "abc-2" })))
        .await
        .unwrap();
    assert_eq!(read_json(other).await["reply"], FALLBACK_REPLY);

    let r2 = app
        .oneshot(chat_request(json!({ "message": "care", "session_id": "abc-1" })))
        .await
        .unwrap();
    assert_eq!(read_json(r2).await["reply"], care_of("malaria").as_str());
}

#[tokio::test]
async fn chat_accepts_session_header() {
    let app = test_router();

    let turn = |msg: &str| {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header("x-session-id", "hdr-7")
            .body(Body::from(json!({ "message": msg }).to_string()))
            .unwrap()
    };

    let r1 = app.clone().oneshot(turn("dengue")).await.unwrap();
    assert_eq!(read_json(r1).await["session_id"], "hdr-7");
    let r2 = app.clone().oneshot(turn("what now")).await.unwrap();
    assert_eq!(read_json(r2).await["reply"], CATEGORY_REPROMPT);
    let r3 = app.oneshot(turn("care")).await.unwrap();
    assert_eq!(read_json(r3).await["reply"], care_of("dengue").as_str());
}

#[tokio::test]
async fn invalid_session_id_is_replaced() {
    let app = test_router();
    let resp = app
        .oneshot(chat_request(json!({ "message": "zika", "session_id": "not valid!" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    let id = v["session_id"].as_str().expect("session id string");
    assert_ne!(id, "not valid!");
    assert!(healthbot::session::is_valid_session_id(id));
}

#[tokio::test]
async fn malformed_chat_body_is_a_client_error() {
    let app = test_router();
    let resp = app
        .oneshot(chat_request(json!({ "text": "dengue care" })))
        .await
        .unwrap();
    assert!(
        resp.status().is_client_error(),
        "missing `message` should be 4xx, got {}",
        resp.status()
    );
}

#[tokio::test]
async fn delete_forgets_pending_disease() {
    let app = test_router();

    app.clone()
        .oneshot(chat_request(json!({ "message": "rabies", "session_id": "del-1" })))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/chat/del-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(chat_request(json!({ "message": "care", "session_id": "del-1" })))
        .await
        .unwrap();
    assert_eq!(read_json(resp).await["reply"], FALLBACK_REPLY);
}

#[tokio::test]
async fn diseases_are_listed_in_order() {
    let app = test_router();
    let resp = app
        .oneshot(Request::get("/diseases").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 37);
    assert_eq!(arr[0], json!({ "id": "common_cold", "title": "Common Cold" }));
}

#[tokio::test]
async fn static_ui_is_served() {
    let app = test_router();
    let resp = app
        .oneshot(Request::get("/ui/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("HealthBot"));
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let app = test_router();
    let resp = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header("origin", "http://example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some("http://example.com")
    );
}
