//! Exchange module - Binance.US spot adapter

pub mod auth;
pub mod client;
pub mod messages;
pub mod rest;

pub use client::BinanceClient;
pub use rest::BinanceRestClient;
