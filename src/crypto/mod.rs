pub mod pkce;

pub use pkce::Pkce;
