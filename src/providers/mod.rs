mod spotify;
mod traits;

pub use spotify::SpotifyProvider;
pub use traits::{OAuthProvider, TokenSet};
