//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, matched route)
//!     → hello.rs (the only endpoint)
//!     → Send to client
//! ```

pub mod hello;
pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdGenerator, UNMATCHED_ROUTE, X_REQUEST_ID};
pub use server::{build_router, instrument, HttpServer};
