pub mod authenticator;
pub mod browser;
pub mod cache;
pub mod callback;
pub mod manager;
pub mod state;
pub mod token;

pub use authenticator::{AuthorizationGrant, Authenticator, DEFAULT_CALLBACK_TIMEOUT};
pub use browser::{SystemBrowser, UrlOpener};
pub use cache::TokenCache;
pub use callback::{CallbackAddress, CallbackListener, CallbackResult};
pub use manager::{Credentials, GrantKind, TokenManager};
pub use state::generate_state;
pub use token::Token;
