//! Feed module - post stream client

pub mod auth;
pub mod messages;
pub mod websocket;

pub use websocket::PostStreamClient;
