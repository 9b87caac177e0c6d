//! Spotify session state — refresh token persistence and access token caching.

pub mod manager;
pub mod store;

pub use manager::TokenManager;
pub use store::TokenFile;
