use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::oauth::token::Token;

/// Token fields persisted in the configuration file between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub token_type: String,
}

impl TokenCache {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }

    /// The cached token, or `None` when nothing usable is cached.
    pub fn to_token(&self) -> Option<Token> {
        if self.is_empty() {
            return None;
        }
        Some(Token {
            access_token: self.access_token.clone(),
            refresh_token: Some(self.refresh_token.clone()).filter(|t| !t.is_empty()),
            expiry: self.expiry,
            token_type: self.token_type.clone(),
        })
    }
}

impl From<&Token> for TokenCache {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone().unwrap_or_default(),
            expiry: token.expiry,
            token_type: token.token_type.clone(),
        }
    }
}
