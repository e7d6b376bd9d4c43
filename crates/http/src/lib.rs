//! HTTP client for the Shopfront e-commerce REST API

pub mod client;
pub mod types;

pub use client::{ClientError, RefreshError, SessionEvent, ShopClient, ShopClientBuilder};
