use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientOptions, Endpoints, DEFAULT_SCOPES};
use crate::error::IntiError;
use crate::oauth::{CallbackAddress, Credentials, GrantKind, TokenCache, UrlOpener};

/// The `inti.json` configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub callback: CallbackSettings,
    #[serde(default)]
    pub endpoints: EndpointSettings,
    #[serde(default, skip_serializing_if = "TokenCache::is_empty")]
    pub cache: TokenCache,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub grant: GrantKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default = "default_true")]
    pub open_browser: bool,
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            grant: GrantKind::default(),
            scopes: Vec::new(),
            open_browser: true,
            callback_timeout_secs: default_callback_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackSettings {
    #[serde(default = "default_callback_host")]
    pub host: String,
    #[serde(default = "default_callback_port")]
    pub port: u16,
    #[serde(default = "default_callback_path")]
    pub path: String,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        let addr = CallbackAddress::default();
        Self {
            host: addr.host,
            port: addr.port,
            path: addr.path,
        }
    }
}

/// Endpoint overrides; unset entries use the production URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_callback_timeout_secs() -> u64 {
    120
}

fn default_callback_host() -> String {
    CallbackAddress::default().host
}

fn default_callback_port() -> u16 {
    CallbackAddress::default().port
}

fn default_callback_path() -> String {
    CallbackAddress::default().path
}

impl Settings {
    pub fn validate(&self) -> Result<(), IntiError> {
        if self.auth.client_id.trim().is_empty() {
            return Err(IntiError::MissingCredential("client id"));
        }
        if self.auth.client_secret.trim().is_empty() {
            return Err(IntiError::MissingCredential("client secret"));
        }
        if !self.callback.path.starts_with('/') {
            return Err(IntiError::InvalidArgument(format!(
                "Callback path '{}' must start with '/'",
                self.callback.path
            )));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Endpoints {
        let defaults = Endpoints::default();
        Endpoints {
            token_url: self.endpoints.token_url.clone().unwrap_or(defaults.token_url),
            auth_url: self.endpoints.auth_url.clone().unwrap_or(defaults.auth_url),
            api_url: self.endpoints.api_url.clone().unwrap_or(defaults.api_url),
        }
    }

    /// Project the file configuration into library client options.
    ///
    /// `opener` is only attached when `auth.open_browser` is set.
    pub fn client_options(
        &self,
        opener: Option<Arc<dyn UrlOpener>>,
    ) -> Result<ClientOptions, IntiError> {
        self.validate()?;

        let scopes = if self.auth.scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            self.auth.scopes.clone()
        };

        let mut options = ClientOptions::new(Credentials {
            client_id: self.auth.client_id.clone(),
            client_secret: self.auth.client_secret.clone(),
        })
        .with_endpoints(self.endpoints())
        .with_grant(self.auth.grant)
        .with_scopes(scopes)
        .with_callback(
            CallbackAddress {
                host: self.callback.host.clone(),
                port: self.callback.port,
                path: self.callback.path.clone(),
            },
            Duration::from_secs(self.auth.callback_timeout_secs),
        );

        if !self.cache.is_empty() {
            options = options.with_token_cache(self.cache.clone());
        }
        if let Some(opener) = opener.filter(|_| self.auth.open_browser) {
            options = options.with_opener(opener);
        }
        Ok(options)
    }
}
