//! Server push subsystem.
//!
//! # Data Flow
//! ```text
//! GET    /__sse/:clientId                      → open stream, register client
//! POST   /__sse/:clientId/channel/:channel     → join channel
//! DELETE /__sse/:clientId/channel/:channel     → leave channel
//!
//! application code → PushHub::emit(channel, payload)
//!     → frame.rs (one `event:`/`data:` frame, serialized once)
//!     → every member's stream sink
//! ```
//!
//! # Design Decisions
//! - Membership and client maps are sharded; operations on different
//!   clients do not contend
//! - Lifecycle listeners run after the state change has succeeded and never
//!   for a failed or idempotent operation

pub mod error;
pub mod events;
pub mod frame;
pub mod hub;

pub use error::HubError;
pub use events::{LifecycleEvent, LifecycleKind, LifecycleListener};
pub use frame::{FrameParser, PushEvent};
pub use hub::{ChannelSummary, Delivery, PushHub, SubscribeOutcome, CHANNEL_ROUTE, CONNECT_ROUTE};
