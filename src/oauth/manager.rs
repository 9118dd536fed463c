use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::ClientOptions;
use crate::error::IntiError;
use crate::oauth::authenticator::Authenticator;
use crate::oauth::token::{self, GrantRequest, Token};
use crate::transport::TaggedClient;

/// Which grant the manager runs when no valid or refreshable token exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Browser-based authorization-code flow through the loopback listener.
    #[default]
    AuthorizationCode,
    /// Direct exchange of the client id and secret.
    ClientCredentials,
}

/// OAuth2 client credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Owns the current token and keeps it valid.
///
/// The stored token sits behind one async mutex held for the whole of
/// [`TokenManager::ensure_valid_token`], so concurrent callers are serialized
/// and at most one exchange or interactive flow runs at a time.
#[derive(Debug)]
pub struct TokenManager {
    credentials: Credentials,
    token_url: String,
    grant: GrantKind,
    scopes: Vec<String>,
    authenticator: Authenticator,
    callback_timeout: Duration,
    http: TaggedClient,
    token: Mutex<Option<Token>>,
}

impl TokenManager {
    pub fn new(options: &ClientOptions, http: TaggedClient) -> Self {
        let mut authenticator = Authenticator::new(
            options.credentials.client_id.clone(),
            options.endpoints.auth_url.clone(),
            options.scopes.clone(),
            options.callback.clone(),
        );
        if let Some(opener) = &options.opener {
            authenticator = authenticator.with_opener(opener.clone());
        }

        let cached = options.token_cache.as_ref().and_then(|c| c.to_token());
        if cached.is_some() {
            tracing::debug!("using cached access token");
        }

        Self {
            credentials: options.credentials.clone(),
            token_url: options.endpoints.token_url.clone(),
            grant: options.grant,
            scopes: options.scopes.clone(),
            authenticator,
            callback_timeout: options.callback_timeout,
            http,
            token: Mutex::new(cached),
        }
    }

    /// Return a valid token, exchanging or re-authenticating when needed.
    ///
    /// A valid stored token is returned without any network call. Otherwise a
    /// stored refresh token is tried first; if it is missing or rejected the
    /// configured grant runs. The stored token is replaced only on success.
    pub async fn ensure_valid_token(&self) -> Result<Token, IntiError> {
        let mut stored = self.token.lock().await;
        if let Some(token) = stored.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        tracing::debug!("access token is invalid or expired, authenticating for new token");

        let refresh_token = stored
            .as_ref()
            .and_then(|t| t.refresh_token())
            .map(str::to_string);
        if let Some(refresh_token) = refresh_token {
            match self
                .exchange(GrantRequest::RefreshToken {
                    refresh_token: &refresh_token,
                })
                .await
            {
                Ok(mut token) => {
                    if token.refresh_token.is_none() {
                        token.refresh_token = Some(refresh_token);
                    }
                    tracing::debug!("refreshed access token");
                    *stored = Some(token.clone());
                    return Ok(token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, grant = ?self.grant, "refresh token rejected, running full grant");
                }
            }
        }

        let token = match self.grant {
            GrantKind::ClientCredentials => {
                self.exchange(GrantRequest::ClientCredentials {
                    scopes: &self.scopes,
                })
                .await?
            }
            GrantKind::AuthorizationCode => {
                let grant = self
                    .authenticator
                    .obtain_authorization_code(self.callback_timeout)
                    .await?;
                tracing::debug!("exchanging code");
                self.exchange(GrantRequest::AuthorizationCode {
                    code: &grant.code,
                    redirect_uri: &grant.redirect_uri,
                })
                .await?
            }
        };

        tracing::debug!(token_type = %token.token_type, "obtained new access token");
        *stored = Some(token.clone());
        Ok(token)
    }

    /// Snapshot of the stored token, valid or not.
    pub async fn current_token(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| t.is_valid())
    }

    async fn exchange(&self, grant: GrantRequest<'_>) -> Result<Token, IntiError> {
        token::exchange(
            &self.http,
            &self.token_url,
            &self.credentials.client_id,
            &self.credentials.client_secret,
            grant,
        )
        .await
        .map_err(IntiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::cache::TokenCache;

    fn options(cache: Option<TokenCache>) -> ClientOptions {
        let mut options = ClientOptions::new(Credentials {
            client_id: "foo".into(),
            client_secret: "bar".into(),
        });
        // Unroutable endpoints: any network attempt would fail the test.
        options.endpoints.token_url = "http://127.0.0.1:9/token".into();
        options.token_cache = cache;
        options
    }

    #[tokio::test]
    async fn valid_cached_token_is_returned_without_exchange() {
        let cache = TokenCache {
            access_token: "cached".into(),
            expiry: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
            token_type: "bearer".into(),
            ..Default::default()
        };
        let manager = TokenManager::new(&options(Some(cache)), TaggedClient::new().unwrap());
        assert!(manager.is_authenticated().await);
        let token = manager.ensure_valid_token().await.unwrap();
        assert_eq!(token.access_token, "cached");
    }

    #[tokio::test]
    async fn no_cache_means_not_authenticated() {
        let manager = TokenManager::new(&options(None), TaggedClient::new().unwrap());
        assert!(!manager.is_authenticated().await);
        assert!(manager.current_token().await.is_none());
    }

    #[test]
    fn grant_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&GrantKind::ClientCredentials).unwrap(),
            "\"client_credentials\""
        );
        let kind: GrantKind = serde_json::from_str("\"authorization_code\"").unwrap();
        assert_eq!(kind, GrantKind::AuthorizationCode);
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials {
            client_id: "foo".into(),
            client_secret: "bar".into(),
        };
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("foo"));
        assert!(!dbg.contains("bar"));
    }
}
