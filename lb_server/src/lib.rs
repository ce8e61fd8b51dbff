//! HTTP server for the league bracket engine.
//!
//! The binary in `main.rs` wires configuration, logging and storage
//! together; the router itself lives in [`api`] so it can be driven from
//! tests without a socket.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
