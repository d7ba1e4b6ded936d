//! Push hub domain errors.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response;

#[derive(Debug, Error)]
pub enum HubError {
    /// No stream is registered for the client.
    #[error("Unknown Client ID")]
    UnknownClient { client_id: String },

    /// The channel has never had a subscriber.
    #[error("Unknown Channel")]
    UnknownChannel { channel: String },

    /// The channel exists but the client is not a member.
    #[error("Not subscribed to this channel")]
    NotSubscribed { client_id: String, channel: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HubError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, HubError::Serialize(_))
    }
}

/// Membership errors become 404 with their message; anything else is a
/// generic server error.
impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            response::not_found(&self.to_string())
        } else {
            response::server_error("Server error")
        }
    }
}
