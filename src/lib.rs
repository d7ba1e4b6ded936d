//! Push Router Library
//!
//! An ordered HTTP route table with path parameters, plus a push hub that
//! streams named-channel events to long-lived `text/event-stream` clients.

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod push;
pub mod routing;

pub use app::App;
pub use client::PushClient;
pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use push::PushHub;
pub use routing::Router;
