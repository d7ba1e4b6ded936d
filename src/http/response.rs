//! Response construction helpers.
//!
//! # Responsibilities
//! - Plain status + bytes responses
//! - Text responses for the fixed router messages
//! - JSON responses
//! - Opening a persistent `text/event-stream` response
//!
//! # Design Decisions
//! - CORS headers are not set here; the server layer adds them to every
//!   response, including ones the router never sees
//! - Stream bodies end only when every sink for them has been dropped

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::stream;
use serde::Serialize;
use std::convert::Infallible;

use crate::http::stream::StreamSink;
use crate::routing::handler::HandlerError;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Status code and raw body bytes, no content type.
pub fn respond(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = Response::new(Body::from(body.into()));
    *response.status_mut() = status;
    response
}

pub fn text(status: StatusCode, message: &str) -> Response {
    let mut response = respond(status, message.to_owned());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn ok(message: &str) -> Response {
    text(StatusCode::OK, message)
}

pub fn not_found(message: &str) -> Response {
    text(StatusCode::NOT_FOUND, message)
}

pub fn server_error(message: &str) -> Response {
    text(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// 200 with `value` serialized as JSON.
pub fn respond_json<T: Serialize + ?Sized>(value: &T) -> Result<Response, HandlerError> {
    let body = serde_json::to_vec(value)?;
    let mut response = respond(StatusCode::OK, body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

/// Open an unbounded event-stream response. Frames written to the returned
/// sink are sent to the client in order; at most `buffer` frames are queued.
pub fn open_stream(buffer: usize) -> (StreamSink, Response) {
    let (sink, rx) = StreamSink::channel(buffer);

    let frames = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|frame| (Ok::<_, Infallible>(frame), rx))
    });

    let mut response = Response::new(Body::from_stream(frames));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    (sink, response)
}
