// src/server/mod.rs

//! Trigger server: a tiny one-request-per-connection TCP listener.
//!
//! - [`protocol`] reads requests and formats reply lines.
//! - [`trigger_server`] owns the listener and dispatches tokens.

pub mod protocol;
pub mod trigger_server;

pub use trigger_server::{ServerOptions, TriggerServer};
