//! Client for the hosted tables/auth backend.

pub mod api_types;
pub mod client;
pub mod types;
