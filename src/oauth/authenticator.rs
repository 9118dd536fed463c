use std::sync::Arc;
use std::time::Duration;

use crate::error::{AuthError, IntiError};
use crate::oauth::browser::UrlOpener;
use crate::oauth::callback::{CallbackAddress, CallbackListener};
use crate::oauth::state::generate_state;

/// How long the interactive flow waits for the provider redirect by default.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// An authorization code together with the redirect URI it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub redirect_uri: String,
}

/// Drives the browser-based authorization-code flow.
pub struct Authenticator {
    client_id: String,
    auth_url: String,
    scopes: Vec<String>,
    callback: CallbackAddress,
    opener: Option<Arc<dyn UrlOpener>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .field("scopes", &self.scopes)
            .field("callback", &self.callback)
            .field("opener", &self.opener.is_some())
            .finish()
    }
}

impl Authenticator {
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        scopes: Vec<String>,
        callback: CallbackAddress,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: auth_url.into(),
            scopes,
            callback,
            opener: None,
        }
    }

    /// Hand the authorization URL to `opener` in addition to logging it.
    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Run one interactive attempt and return the authorization code.
    ///
    /// A fresh state value is generated on every call. The local listener is
    /// shut down before this returns, whatever the outcome.
    pub async fn obtain_authorization_code(
        &self,
        timeout: Duration,
    ) -> Result<AuthorizationGrant, IntiError> {
        let mut url = reqwest::Url::parse(&self.auth_url).map_err(|e| {
            IntiError::InvalidArgument(format!(
                "Invalid authorization URL '{}': {e}",
                self.auth_url
            ))
        })?;

        tracing::info!("starting interactive authentication flow");
        let state = generate_state();
        let (listener, result_rx) = CallbackListener::start(&self.callback, state.clone()).await?;
        let redirect_uri = listener.redirect_uri().to_string();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &redirect_uri)
                .append_pair("response_type", "code");
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            query
                .append_pair("state", &state)
                .append_pair("access_type", "offline");
        }

        tracing::warn!("Please authenticate: {url}");

        if let Some(opener) = &self.opener {
            tracing::info!("opening system browser to authenticate");
            if let Err(e) = opener.open(url.as_str()).await {
                tracing::warn!(url = %url, error = %e, "could not open browser");
            }
        }

        tracing::debug!("waiting for callback click");
        let outcome = tokio::time::timeout(timeout, result_rx).await;
        listener.shutdown().await;

        let result = match outcome {
            Err(_) => return Err(AuthError::Timeout(timeout).into()),
            Ok(Err(_)) => {
                return Err(AuthError::Listener(std::io::Error::other(
                    "callback listener stopped before delivering a result",
                ))
                .into())
            }
            Ok(Ok(result)) => result,
        };

        if let Some(err) = result.error {
            return Err(err.into());
        }
        if result.code.is_empty() {
            return Err(AuthError::EmptyCode.into());
        }

        tracing::debug!("successfully retrieved new code");
        Ok(AuthorizationGrant {
            code: result.code,
            redirect_uri,
        })
    }
}
