//! loy-daemon library surface.
//!
//! Exposed as a lib so integration tests can build the router and state
//! in-process (`tower::ServiceExt::oneshot`) without binding a socket.

pub mod api_types;
pub mod config;
pub mod routes;
pub mod state;
