//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (OPTIONS short-circuit, dispatch, failure buckets)
//!     → table.rs (ordered scan, first structural match)
//!     → matcher.rs (segment comparison, parameter extraction)
//!     → handler.rs (invoke the matched handler)
//!
//! Route registration (at startup):
//!     router.get/post/put/delete(pattern, handler)
//!     → appended to the RouteTable in registration order
//!     → Router moved into the server, shared immutably
//! ```
//!
//! # Design Decisions
//! - Routes are registered on `&mut Router` before serving; no locks on the hot path
//! - First match wins, ordered by registration; no priorities, no deduplication
//! - Strict matcher: a trailing slash is an extra empty segment
//! - Exactly two failure buckets: no route, or handler failure

pub mod handler;
pub mod matcher;
pub mod router;
pub mod table;

pub use handler::{Handler, HandlerError, HandlerResult};
pub use matcher::PathPattern;
pub use router::{DispatchError, Router};
pub use table::{Route, RouteNotFound, RouteTable};
