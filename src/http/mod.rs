//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → context.rs (method, raw path, headers, buffered body)
//!     → [routing layer picks the handler]
//!     → response.rs (plain, JSON or event-stream response)
//!     → stream.rs (sink that feeds an open event stream)
//! ```

pub mod context;
pub mod response;
pub mod server;
pub mod stream;

pub use context::{BodyError, RequestContext};
pub use server::HttpServer;
pub use stream::{StreamSink, StreamWriteError};
