//! Push protocol and HTTP surface, driven through the full middleware stack.

use axum::http::{header, Method, StatusCode};
use push_router::config::ServerConfig;
use push_router::push::FrameParser;
use push_router::routing::HandlerError;
use push_router::{HttpServer, PushHub, Router};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_text, json_request, next_event, request, test_app};

fn assert_cors(response: &axum::response::Response) {
    for name in [
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::ACCESS_CONTROL_ALLOW_METHODS,
    ] {
        assert_eq!(response.headers()[&name], "*", "missing {name}");
    }
}

#[tokio::test]
async fn options_preflight_is_bare_ok_with_cors() {
    let (app, _hub) = test_app(ServerConfig::default());

    let response = app
        .oneshot(request(Method::OPTIONS, "/__sse/c1/channel/scores"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn unknown_route_is_404_with_cors_and_request_id() {
    let (app, _hub) = test_app(ServerConfig::default());

    let response = app.oneshot(request(Method::GET, "/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "Not found");
}

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let (app, _hub) = test_app(ServerConfig::default());

    let mut req = request(Method::GET, "/health");
    req.headers_mut()
        .insert("x-request-id", "req-42".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn handler_failure_is_generic_500_with_cors() {
    let config = ServerConfig::default();
    let mut router = Router::new();
    let hub = PushHub::attach(&mut router, config.push.clone());
    router.get("/boom", |_ctx| async {
        Err(HandlerError::Other("connection string leaked".into()))
    });
    let app = HttpServer::new(config, router, hub).app();

    let response = app.oneshot(request(Method::GET, "/boom")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    assert_eq!(body_text(response).await, "Server error");
}

#[tokio::test]
async fn connect_subscribe_emit_delivers_exact_frame() {
    let (app, hub) = test_app(ServerConfig::default());

    let stream = app
        .clone()
        .oneshot(request(Method::GET, "/__sse/c1"))
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    assert_eq!(stream.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_cors(&stream);
    assert!(hub.is_connected("c1"));

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/__sse/c1/channel/scores"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");

    let delivery = hub.emit("scores", &json!({ "value": 42 })).unwrap();
    assert_eq!(delivery.delivered, 1);

    let mut body = stream.into_body().into_data_stream();
    let mut parser = FrameParser::new();
    let event = next_event(&mut body, &mut parser).await;
    assert_eq!(event.event.as_deref(), Some("scores"));
    assert_eq!(event.data, r#"{"value":42}"#);
    assert_eq!(parser.pending(), 0);
}

#[tokio::test]
async fn emit_route_pushes_to_subscribers() {
    let (app, _hub) = test_app(ServerConfig::default());

    let stream = app
        .clone()
        .oneshot(request(Method::GET, "/__sse/c1"))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(Method::POST, "/__sse/c1/channel/news"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/channels/news/events",
            r#"{"headline":"hi"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(report["delivered"], 1);

    let mut body = stream.into_body().into_data_stream();
    let event = next_event(&mut body, &mut FrameParser::new()).await;
    assert_eq!(event.json(), json!({ "headline": "hi" }));
}

#[tokio::test]
async fn subscribe_unknown_client_is_404() {
    let (app, hub) = test_app(ServerConfig::default());

    let response = app
        .oneshot(request(Method::POST, "/__sse/ghost/channel/scores"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Unknown Client ID");
    assert!(hub.channels().is_empty());
}

#[tokio::test]
async fn repeated_subscribe_is_ok_and_reported() {
    let (app, hub) = test_app(ServerConfig::default());
    let _stream = app
        .clone()
        .oneshot(request(Method::GET, "/__sse/c1"))
        .await
        .unwrap();

    for expected in ["", "Already subscribed to this channel"] {
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/__sse/c1/channel/scores"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, expected);
    }
    assert_eq!(hub.channel_members("scores").unwrap().len(), 1);
}

#[tokio::test]
async fn unsubscribe_reports_each_failure() {
    let (app, _hub) = test_app(ServerConfig::default());

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/__sse/c1/channel/scores"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Unknown Client ID");

    let _c1 = app
        .clone()
        .oneshot(request(Method::GET, "/__sse/c1"))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/__sse/c1/channel/scores"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Unknown Channel");

    let _c2 = app
        .clone()
        .oneshot(request(Method::GET, "/__sse/c2"))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(Method::POST, "/__sse/c2/channel/scores"))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/__sse/c1/channel/scores"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Not subscribed to this channel");

    let response = app
        .oneshot(request(Method::DELETE, "/__sse/c2/channel/scores"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn trailing_slash_does_not_match() {
    let (app, hub) = test_app(ServerConfig::default());

    let response = app.oneshot(request(Method::GET, "/__sse/c1/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!hub.is_connected("c1"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = ServerConfig::default();
    config.limits.max_body_bytes = 16;
    let (app, _hub) = test_app(config);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/channels/news/events",
            r#"{"headline":"far too long for the limit"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
