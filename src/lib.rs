pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod transport;
pub mod types;

pub use client::{Client, ClientOptions, Endpoints};
pub use config::Settings;
pub use error::{AuthError, IntiError};
pub use oauth::{CallbackAddress, Credentials, GrantKind, Token, TokenCache, UrlOpener};
pub use types::{IpLookup, Program, Submission, SubmissionFilter};
