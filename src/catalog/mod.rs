//! Product catalog: domain types, REST client and cache wiring.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod types;
