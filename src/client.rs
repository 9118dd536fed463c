use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IntiError;
use crate::oauth::{
    CallbackAddress, Credentials, GrantKind, Token, TokenCache, TokenManager, UrlOpener,
    DEFAULT_CALLBACK_TIMEOUT,
};
use crate::transport::TaggedClient;

pub const DEFAULT_TOKEN_URL: &str = "https://login.intigriti.com/connect/token";
pub const DEFAULT_AUTH_URL: &str = "https://login.intigriti.com/connect/authorize";
pub const DEFAULT_API_URL: &str = "https://api.intigriti.com/external";

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: &[&str] = &[
    "offline_access",
    "company_external_api",
    "core_platform:read",
    "core_platform:write",
];

/// Identity provider and API base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub token_url: String,
    pub auth_url: String,
    pub api_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Everything a [`Client`] needs to authenticate and reach the API.
#[derive(Clone)]
pub struct ClientOptions {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub grant: GrantKind,
    pub scopes: Vec<String>,
    pub callback: CallbackAddress,
    pub callback_timeout: Duration,
    pub token_cache: Option<TokenCache>,
    pub opener: Option<Arc<dyn UrlOpener>>,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("grant", &self.grant)
            .field("scopes", &self.scopes)
            .field("callback", &self.callback)
            .field("callback_timeout", &self.callback_timeout)
            .field("token_cache", &self.token_cache.is_some())
            .field("opener", &self.opener.is_some())
            .finish()
    }
}

impl ClientOptions {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoints: Endpoints::default(),
            grant: GrantKind::default(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback: CallbackAddress::default(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            token_cache: None,
            opener: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_grant(mut self, grant: GrantKind) -> Self {
        self.grant = grant;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_callback(mut self, callback: CallbackAddress, timeout: Duration) -> Self {
        self.callback = callback;
        self.callback_timeout = timeout;
        self
    }

    pub fn with_token_cache(mut self, cache: TokenCache) -> Self {
        self.token_cache = Some(cache);
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn validate(&self) -> Result<(), IntiError> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(IntiError::MissingCredential("client id"));
        }
        if self.credentials.client_secret.trim().is_empty() {
            return Err(IntiError::MissingCredential("client secret"));
        }
        Ok(())
    }
}

/// Authenticated handle on the company API.
///
/// Accessors live in [`crate::api`]; each one asks the token manager for a
/// valid token before sending its request.
#[derive(Debug)]
pub struct Client {
    api_url: String,
    http: TaggedClient,
    tokens: TokenManager,
}

impl Client {
    /// Build a client without touching the network.
    pub fn new(options: ClientOptions) -> Result<Self, IntiError> {
        options.validate()?;
        let http = TaggedClient::new()?;
        Ok(Self::with_http(options, http))
    }

    /// Build a client and make sure it holds a valid token.
    pub async fn connect(options: ClientOptions) -> Result<Self, IntiError> {
        let client = Self::new(options)?;
        client.authenticate().await?;
        tracing::debug!("successfully created client");
        Ok(client)
    }

    pub fn with_http(options: ClientOptions, http: TaggedClient) -> Self {
        let tokens = TokenManager::new(&options, http.clone());
        Self {
            api_url: options.endpoints.api_url.trim_end_matches('/').to_string(),
            http,
            tokens,
        }
    }

    /// Return a valid token, authenticating if required.
    pub async fn authenticate(&self) -> Result<Token, IntiError> {
        self.tokens.ensure_valid_token().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// The token currently held, for persisting into the token cache.
    pub async fn token(&self) -> Option<Token> {
        self.tokens.current_token().await
    }

    pub(crate) fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn http(&self) -> &TaggedClient {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(id: &str, secret: &str) -> Credentials {
        Credentials {
            client_id: id.into(),
            client_secret: secret.into(),
        }
    }

    #[test]
    fn options_default_to_production() {
        let options = ClientOptions::new(creds("foo", "bar"));
        assert_eq!(options.endpoints.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(options.endpoints.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(options.endpoints.api_url, DEFAULT_API_URL);
        assert_eq!(options.grant, GrantKind::AuthorizationCode);
        assert_eq!(options.scopes.len(), DEFAULT_SCOPES.len());
        assert_eq!(options.callback_timeout, Duration::from_secs(120));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = Client::new(ClientOptions::new(creds("", "bar"))).unwrap_err();
        assert!(matches!(err, IntiError::MissingCredential("client id")));
        let err = Client::new(ClientOptions::new(creds("foo", " "))).unwrap_err();
        assert!(matches!(err, IntiError::MissingCredential("client secret")));
    }

    #[test]
    fn api_url_trailing_slash_is_trimmed() {
        let options = ClientOptions::new(creds("foo", "bar")).with_endpoints(Endpoints {
            api_url: "https://api.example.com/external/".into(),
            ..Endpoints::default()
        });
        let client = Client::new(options).unwrap();
        assert_eq!(client.api_url(), "https://api.example.com/external");
    }

    #[test]
    fn options_debug_hides_secret() {
        let options = ClientOptions::new(creds("foo", "hunter2"));
        assert!(!format!("{options:?}").contains("hunter2"));
    }
}
