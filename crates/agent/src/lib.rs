//! Homeserver monitor process wiring
//!
//! Configuration, the alert rule source and the HTTP surface around the
//! metrics engine in `agent-lib`.

pub mod api;
pub mod config;
pub mod rules;
