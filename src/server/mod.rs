//! HTTP/WebSocket surface consumed by the web client.

pub mod ws;

pub use ws::{chat_routes, AppState, BroadcastNavigator};
