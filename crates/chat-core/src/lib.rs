//! Streaming chat core.
//!
//! Everything here is platform-free: the browser adapters in `chat-platform`
//! plug in through the traits in [`ports`].

pub mod ports;
pub mod event_bus;
pub mod store;
pub mod tokens;
pub mod connection;
pub mod reconcile;
pub mod controller;
